use crate::app::dto::EnhanceRequest;
use crate::domain::model::LanguageCode;
use crate::utils::error::{EnhanceError, Result};
use crate::utils::validation::Validate;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Parser)]
#[command(name = "term-enhancer")]
#[command(about = "Enrich terms with multilingual translations and web evidence")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "term-enhancer.toml")]
    pub config: PathBuf,

    /// Request JSON file ({"terms": [...], "target_languages": [...]})
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file; prints to stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Skip cache lookup and write-back")]
    pub no_cache: bool,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub concurrent_batches: Option<usize>,

    /// Comma separated language codes, e.g. ko,ja,en
    #[arg(long, value_delimiter = ',')]
    pub languages: Vec<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON logs")]
    pub json_logs: bool,

    /// Show the batch/round plan without calling providers
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// 命令列參數覆蓋請求檔中的設定
    pub fn apply_overrides(&self, request: &mut EnhanceRequest) {
        if self.no_cache {
            request.use_cache = false;
        }
        if let Some(batch_size) = self.batch_size {
            request.batch_size = Some(batch_size);
        }
        if let Some(concurrent) = self.concurrent_batches {
            request.concurrent_batches = Some(concurrent);
        }
        if !self.languages.is_empty() {
            request.target_languages = Some(self.languages.clone());
        }
    }

    pub fn load_request(&self) -> Result<EnhanceRequest> {
        let data = fs::read_to_string(&self.input)?;
        let mut request: EnhanceRequest = serde_json::from_str(&data)?;
        self.apply_overrides(&mut request);
        Ok(request)
    }

    pub fn write_output(&self, body: &str) -> Result<()> {
        match &self.output {
            Some(path) => write_file(path, body),
            None => {
                println!("{}", body);
                Ok(())
            }
        }
    }
}

fn write_file(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, body)?;
    Ok(())
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if !self.input.exists() {
            return Err(EnhanceError::InvalidConfigValue {
                field: "input".to_string(),
                value: self.input.display().to_string(),
                reason: "File does not exist".to_string(),
            });
        }
        LanguageCode::parse_list(&self.languages)?;
        Ok(())
    }
}
