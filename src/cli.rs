use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "zipnest")]
#[command(version)]
#[command(about = "Inspect and extract entries of nested ZIP/JAR packages", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipnest -l app.jar                              list every entry, nested ones included\n  \
  zipnest -p app.jar com/x/Y.class                print an entry found at any nesting level\n  \
  zipnest -p 'app.jar!/lib/inner.jar!/log4j.xml'  address one entry explicitly\n  \
  zipnest -l https://example.com/app.jar          index a remote package via Range requests")]
pub struct Cli {
    /// Package path, URL, or nested address (with !/ separators)
    #[arg(value_name = "ADDRESS")]
    pub address: String,

    /// Entries to resolve by name (default: all, when extracting)
    #[arg(value_name = "NAMES")]
    pub names: Vec<String>,

    /// List entries (canonical nested names)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely with method and sizes
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Print resolved entries to stdout
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract entries into DIR
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Container suffix for nested traversal
    #[arg(long = "suffix", value_name = "SUFFIX", default_value = ".jar")]
    pub container_suffix: String,

    /// Quiet mode
    #[arg(short = 'q')]
    pub quiet: bool,
}

impl Cli {
    /// Whether the address names one entry explicitly through `!/`
    /// separators rather than a whole package.
    pub fn is_nested_address(&self) -> bool {
        self.address.contains("!/")
    }

    pub fn is_http_url(&self) -> bool {
        self.address.starts_with("http://") || self.address.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet || self.pipe
    }
}
