use crate::error::{SettingsError, TyplineError};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Mode lines are only looked for in this many lines at the top of a document.
pub const MAX_LINE_FOR_MODE_LINES: usize = 10;

static MODE_LINE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"((kate|katvan):.+)$").ok());

/// Where a mode line came from. Some variables are only honored in the
/// application's own settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSource {
    Settings,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineNumberStyle {
    BothSides,
    PrimaryOnly,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndentMode {
    None,
    Normal,
    /// Indentation driven by the code model.
    Smart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndentStyle {
    Spaces,
    Tabs,
}

/// Editor settings, each of which may be left unset.
///
/// Settings are read from mode lines such as
/// `katvan: font DejaVu Sans; font-size 12; replace-tabs on;` and layered
/// with [`EditorSettings::merge`]. The getters apply defaults for unset values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EditorSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_mode: Option<IndentMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_style: Option<IndentStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number_style: Option<LineNumberStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_control_chars: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_brackets: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_trigger_completions: Option<bool>,
    /// Minutes between automatic backups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_interval: Option<u32>,
}

fn parse_bool(value: &str) -> Option<bool> {
    if ["on", "true", "1"]
        .iter()
        .any(|v| value.eq_ignore_ascii_case(v))
    {
        Some(true)
    } else if ["off", "false", "0"]
        .iter()
        .any(|v| value.eq_ignore_ascii_case(v))
    {
        Some(false)
    } else {
        None
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Extracts the mode line part of a line of text, starting at `kate:` or
/// `katvan:` and running to the end of the line.
pub fn find_mode_line(line: &str) -> Option<&str> {
    MODE_LINE.as_ref()?.find(line).map(|m| m.as_str())
}

impl EditorSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds settings from a single mode line.
    pub fn from_mode_line(mode: &str, source: ModeSource) -> Self {
        let mut settings = Self::default();
        settings.parse_mode_line(mode, source);
        settings
    }

    /// Applies the variables of a mode line on top of the current values.
    ///
    /// Anything up to a leading `name:` prefix is skipped. Unknown variables
    /// and malformed values are ignored, except that an unrecognized boolean
    /// clears the setting.
    pub fn parse_mode_line(&mut self, mode: &str, source: ModeSource) {
        let mode = match mode.find(':') {
            Some(pos) if pos > 0 => &mode[pos + 1..],
            _ => mode,
        };

        for part in mode.split(';').filter(|p| !p.is_empty()) {
            let part = part.trim();
            let Some((variable, rest)) = part.split_once(' ') else {
                continue;
            };
            let rest = rest.trim();

            match variable {
                "font" => self.font_family = Some(rest.to_string()),
                "font-size" => {
                    if let Some(size) = rest.parse::<u32>().ok().filter(|s| *s > 0) {
                        self.font_size = Some(size);
                    }
                }
                "indent-mode" => match rest {
                    "none" => self.indent_mode = Some(IndentMode::None),
                    "normal" => self.indent_mode = Some(IndentMode::Normal),
                    "typst" => self.indent_mode = Some(IndentMode::Smart),
                    _ => debug!("Ignoring indent mode {rest:?}"),
                },
                "replace-tabs" => {
                    if let Some(spaces) = parse_bool(rest) {
                        self.indent_style = Some(if spaces {
                            IndentStyle::Spaces
                        } else {
                            IndentStyle::Tabs
                        });
                    }
                }
                "indent-width" => {
                    if let Ok(width) = rest.parse::<u32>() {
                        self.indent_width = Some(width);
                    }
                }
                "tab-width" => {
                    if let Ok(width) = rest.parse::<u32>() {
                        self.tab_width = Some(width);
                    }
                }
                "scheme" => self.color_scheme = Some(rest.to_string()),
                "show-line-numbers" => match rest {
                    "both" => self.line_number_style = Some(LineNumberStyle::BothSides),
                    "primary" => self.line_number_style = Some(LineNumberStyle::PrimaryOnly),
                    "none" => self.line_number_style = Some(LineNumberStyle::None),
                    _ => debug!("Ignoring line number style {rest:?}"),
                },
                "show-control-chars" => self.show_control_chars = parse_bool(rest),
                "auto-brackets" => self.auto_brackets = parse_bool(rest),
                "auto-trigger-completions" => self.auto_trigger_completions = parse_bool(rest),
                "backup-interval" if source == ModeSource::Settings => {
                    if let Ok(minutes) = rest.parse::<u32>() {
                        self.backup_interval = Some(minutes);
                    }
                }
                _ => debug!("Ignoring mode line variable {variable:?}"),
            }
        }
    }

    /// Writes the set fields back as a mode line, without any prefix.
    #[must_use]
    pub fn to_mode_line(&self) -> String {
        let mut result = String::new();

        if let Some(family) = &self.font_family {
            result += &format!("font {family}; ");
        }
        if let Some(size) = self.font_size {
            result += &format!("font-size {size}; ");
        }
        if let Some(mode) = self.indent_mode {
            let name = match mode {
                IndentMode::None => "none",
                IndentMode::Normal => "normal",
                IndentMode::Smart => "typst",
            };
            result += &format!("indent-mode {name}; ");
        }
        if let Some(style) = self.indent_style {
            result += &format!("replace-tabs {}; ", on_off(style == IndentStyle::Spaces));
        }
        if let Some(width) = self.indent_width {
            result += &format!("indent-width {width}; ");
        }
        if let Some(width) = self.tab_width {
            result += &format!("tab-width {width}; ");
        }
        if let Some(scheme) = &self.color_scheme {
            result += &format!("scheme {scheme}; ");
        }
        if let Some(style) = self.line_number_style {
            let name = match style {
                LineNumberStyle::BothSides => "both",
                LineNumberStyle::PrimaryOnly => "primary",
                LineNumberStyle::None => "none",
            };
            result += &format!("show-line-numbers {name}; ");
        }
        if let Some(show) = self.show_control_chars {
            result += &format!("show-control-chars {}; ", on_off(show));
        }
        if let Some(auto) = self.auto_brackets {
            result += &format!("auto-brackets {}; ", on_off(auto));
        }
        if let Some(auto) = self.auto_trigger_completions {
            result += &format!("auto-trigger-completions {}; ", on_off(auto));
        }
        if let Some(minutes) = self.backup_interval {
            result += &format!("backup-interval {minutes}; ");
        }

        result.trim().to_string()
    }

    /// Overrides every field that is set in `other`.
    pub fn merge(&mut self, other: &EditorSettings) {
        fn take<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
            if source.is_some() {
                target.clone_from(source);
            }
        }

        take(&mut self.font_family, &other.font_family);
        take(&mut self.font_size, &other.font_size);
        take(&mut self.indent_mode, &other.indent_mode);
        take(&mut self.indent_style, &other.indent_style);
        take(&mut self.indent_width, &other.indent_width);
        take(&mut self.tab_width, &other.tab_width);
        take(&mut self.color_scheme, &other.color_scheme);
        take(&mut self.line_number_style, &other.line_number_style);
        take(&mut self.show_control_chars, &other.show_control_chars);
        take(&mut self.auto_brackets, &other.auto_brackets);
        take(&mut self.auto_trigger_completions, &other.auto_trigger_completions);
        take(&mut self.backup_interval, &other.backup_interval);
    }

    pub fn effective_indent_mode(&self) -> IndentMode {
        self.indent_mode.unwrap_or(IndentMode::None)
    }

    pub fn effective_indent_style(&self) -> IndentStyle {
        self.indent_style.unwrap_or(IndentStyle::Spaces)
    }

    pub fn effective_indent_width(&self) -> u32 {
        self.indent_width.unwrap_or(4)
    }

    pub fn effective_tab_width(&self) -> u32 {
        self.tab_width.unwrap_or_else(|| self.effective_indent_width())
    }

    pub fn effective_color_scheme(&self) -> &str {
        self.color_scheme.as_deref().unwrap_or("auto")
    }

    pub fn effective_line_number_style(&self) -> LineNumberStyle {
        self.line_number_style.unwrap_or(LineNumberStyle::BothSides)
    }

    pub fn effective_show_control_chars(&self) -> bool {
        self.show_control_chars.unwrap_or(true)
    }

    pub fn effective_auto_brackets(&self) -> bool {
        self.auto_brackets.unwrap_or(true)
    }

    pub fn effective_auto_trigger_completions(&self) -> bool {
        self.auto_trigger_completions.unwrap_or(true)
    }

    pub fn effective_backup_interval(&self) -> u32 {
        self.backup_interval.unwrap_or(15)
    }

    /// Reads settings from a `.json`, `.yaml` or `.yml` file.
    ///
    /// # Errors
    /// Returns a `TyplineError::Settings` if the file cannot be read, has an
    /// unknown extension, or does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TyplineError> {
        Ok(Self::read(path.as_ref())?)
    }

    /// Writes the set fields to a `.json`, `.yaml` or `.yml` file.
    ///
    /// # Errors
    /// Returns a `TyplineError::Settings` if the extension is unknown or the
    /// file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TyplineError> {
        Ok(self.write(path.as_ref())?)
    }

    fn read(path: &Path) -> Result<Self, SettingsError> {
        let format = FileFormat::for_path(path)?;
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let settings = match format {
            FileFormat::Json => serde_json::from_str(&contents)?,
            FileFormat::Yaml => serde_yaml::from_str(&contents)?,
        };
        Ok(settings)
    }

    fn write(&self, path: &Path) -> Result<(), SettingsError> {
        let contents = match FileFormat::for_path(path)? {
            FileFormat::Json => serde_json::to_string_pretty(self)?,
            FileFormat::Yaml => serde_yaml::to_string(self)?,
        };
        fs::write(path, contents).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    fn for_path(path: &Path) -> Result<Self, SettingsError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(SettingsError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}
