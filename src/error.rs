use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum TyplineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Settings(#[from] SettingsError),
}

#[derive(Error, Debug, Diagnostic)]
pub enum SettingsError {
    #[error("Could not access settings file {path}")]
    #[diagnostic(
        code(settings::io),
        help("Check that the file exists and that its directory is writable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON settings")]
    #[diagnostic(
        code(settings::json),
        help("The settings file must hold a JSON object with kebab-case keys.")
    )]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML settings")]
    #[diagnostic(
        code(settings::yaml),
        help("The settings file must hold a YAML mapping with kebab-case keys.")
    )]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported settings file format: {path}")]
    #[diagnostic(
        code(settings::unsupported_format),
        help("Use a file ending in .json, .yaml or .yml.")
    )]
    UnsupportedFormat { path: String },
}
