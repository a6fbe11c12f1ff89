#[derive(Clone, Copy, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Indented tree, one line per TLV
    Text,
    /// JSON format
    Json,
}
