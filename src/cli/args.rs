use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "cowscan",
    version,
    about = "web application reconnaissance engine",
    long_about = "Cowscan discovers paths, crawls same-host links, mines request parameters and runs small exploit probes against a single target.\n\nExamples:\n  cowscan discover -u https://target.tld/\n  cowscan crawl -u https://target.tld/ --depth 3\n  cowscan mine -u https://target.tld/ --path /search.php\n  cowscan recon -u https://target.tld/ -o report.json\n  cowscan recon -u https://target.tld/ --config ~/.cowscan/config.yml\n\nTip: Use --config to persist scan settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        global = true,
        help_heading = "Output",
        help = "Write a report to FILE."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        global = true,
        help_heading = "Output",
        help = "Report format: text or json (inferred from the file extension by default)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'u',
        long = "u",
        visible_alias = "url",
        value_name = "URL",
        global = true,
        help_heading = "Input",
        help = "Target URL."
    )]
    pub url: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "",
        global = true,
        help_heading = "Input",
        help = "Path to config file (a bare --config reads ~/.cowscan/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        short = 't',
        long = "conc",
        visible_alias = "concurrency",
        value_name = "N",
        global = true,
        help_heading = "Performance",
        help = "Requests in flight per window."
    )]
    pub concurrency: Option<usize>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        global = true,
        help_heading = "Performance",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'r',
        long = "rt",
        visible_alias = "rate",
        value_name = "RPS",
        global = true,
        help_heading = "Performance",
        help = "Request rate limit (requests per second)."
    )]
    pub rate: Option<u32>,

    #[arg(
        short = 'p',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        global = true,
        help_heading = "HTTP",
        help = "Proxy every request through URL."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'H',
        long = "hdr",
        visible_alias = "header",
        value_name = "HEADER",
        global = true,
        help_heading = "HTTP",
        help = "Extra request header, 'Key: Value'."
    )]
    pub header: Option<String>,

    #[arg(
        short = 'F',
        long = "fr",
        visible_alias = "follow-redirects",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        global = true,
        help_heading = "HTTP",
        help = "Follow redirects (default true)."
    )]
    pub follow_redirects: Option<bool>,

    #[arg(
        long = "ss",
        visible_alias = "success-status",
        value_name = "MIN-MAX",
        global = true,
        help_heading = "Matching",
        help = "Status range counted as found (default 200-299)."
    )]
    pub success_status: Option<String>,

    #[arg(
        long = "np",
        visible_alias = "negative-phrase",
        value_name = "PHRASE",
        action = ArgAction::Append,
        global = true,
        help_heading = "Matching",
        help = "Body phrase marking a soft 404 (repeatable, replaces the defaults)."
    )]
    pub negative_phrase: Vec<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Probe wordlist entries against the target.
    Discover(DiscoverArgs),
    /// Crawl same-host links and probe every link found.
    Crawl(CrawlArgs),
    /// Mine request parameters on a path.
    Mine(MineArgs),
    /// Probe a parameter for command injection.
    Cmdi(ExploitArgs),
    /// Probe a parameter for reflected XSS.
    Xss(XssArgs),
    /// Discover, crawl, then mine every discovered path.
    Recon(ReconArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct DiscoverArgs {
    #[arg(
        short = 'w',
        long = "wl",
        visible_alias = "wordlist",
        value_name = "SRC",
        help_heading = "Discovery",
        help = "Path wordlist file or URL (default SecLists common.txt)."
    )]
    pub wordlist: Option<String>,

    #[arg(
        long = "fe",
        visible_alias = "filter-ext",
        value_name = "EXT",
        help_heading = "Discovery",
        help = "Only print discovered paths ending in EXT."
    )]
    pub filter_ext: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CrawlArgs {
    #[arg(
        short = 'd',
        long = "depth",
        value_name = "N",
        help_heading = "Crawl",
        help = "Crawl depth (default 2)."
    )]
    pub depth: Option<usize>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct MineArgs {
    #[arg(
        long = "path",
        value_name = "PATH",
        help_heading = "Mining",
        help = "Path or URL to mine (defaults to the target)."
    )]
    pub path: Option<String>,

    #[arg(
        short = 'P',
        long = "params",
        value_name = "SRC",
        help_heading = "Mining",
        help = "Parameter wordlist file or URL (default SecLists burp-parameter-names.txt)."
    )]
    pub params: Option<String>,

    #[arg(
        long = "discovered",
        conflicts_with = "path",
        help_heading = "Mining",
        help = "Discover paths with --wordlist first, then mine each of them."
    )]
    pub discovered: bool,

    #[arg(
        short = 'w',
        long = "wl",
        visible_alias = "wordlist",
        value_name = "SRC",
        requires = "discovered",
        help_heading = "Mining",
        help = "Path wordlist used with --discovered."
    )]
    pub wordlist: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ExploitArgs {
    #[arg(
        long = "path",
        value_name = "PATH",
        help_heading = "Exploit",
        help = "Path or URL to test."
    )]
    pub path: String,

    #[arg(
        long = "param",
        value_name = "NAME",
        help_heading = "Exploit",
        help = "Parameter that carries the payload."
    )]
    pub param: String,
}

#[derive(Args, Debug, Clone)]
pub struct XssArgs {
    #[command(flatten)]
    pub target: ExploitArgs,

    #[arg(
        long = "payload",
        value_name = "PAYLOAD",
        help_heading = "Exploit",
        help = "Payload to inject (default <script>alert('XSS')</script>)."
    )]
    pub payload: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ReconArgs {
    #[arg(
        short = 'w',
        long = "wl",
        visible_alias = "wordlist",
        value_name = "SRC",
        help_heading = "Recon",
        help = "Path wordlist file or URL."
    )]
    pub wordlist: Option<String>,

    #[arg(
        short = 'P',
        long = "params",
        value_name = "SRC",
        help_heading = "Recon",
        help = "Parameter wordlist file or URL."
    )]
    pub params: Option<String>,

    #[arg(
        short = 'd',
        long = "depth",
        value_name = "N",
        help_heading = "Recon",
        help = "Crawl depth (default 2)."
    )]
    pub depth: Option<usize>,
}
