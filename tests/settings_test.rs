use std::fs;
use tempfile::tempdir;
use typline::settings::{EditorSettings, IndentMode, IndentStyle, LineNumberStyle, ModeSource};
use typline::{SettingsError, TyplineError};

fn sample_settings() -> EditorSettings {
    EditorSettings::from_mode_line(
        "katvan: font DejaVu Sans; font-size 12; indent-mode typst; replace-tabs off; \
         tab-width 8; scheme dark; show-line-numbers none; backup-interval 3",
        ModeSource::Settings,
    )
}

#[test]
fn test_json_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let settings = sample_settings();

    settings.save(&path).unwrap();
    let loaded = EditorSettings::load(&path).unwrap();
    assert_eq!(loaded, settings);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["font-family"], "DejaVu Sans");
    assert_eq!(json["indent-mode"], "Smart");
    assert!(json.get("indent-width").is_none());
}

#[test]
fn test_yaml_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.yml");
    let settings = sample_settings();

    settings.save(&path).unwrap();
    assert_eq!(EditorSettings::load(&path).unwrap(), settings);
}

#[test]
fn test_partial_file_leaves_other_fields_unset() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.yaml");
    fs::write(&path, "indent-width: 2\nline-number-style: PrimaryOnly\n").unwrap();

    let settings = EditorSettings::load(&path).unwrap();
    assert_eq!(settings.indent_width, Some(2));
    assert_eq!(settings.line_number_style, Some(LineNumberStyle::PrimaryOnly));
    assert_eq!(settings.font_family, None);
    assert_eq!(settings.effective_tab_width(), 2);
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let err = EditorSettings::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, TyplineError::Settings(SettingsError::Io { .. })));
}

#[test]
fn test_malformed_files() {
    let dir = tempdir().unwrap();

    let json = dir.path().join("bad.json");
    fs::write(&json, "{ not json").unwrap();
    assert!(matches!(
        EditorSettings::load(&json).unwrap_err(),
        TyplineError::Settings(SettingsError::Json(_))
    ));

    let yaml = dir.path().join("bad.yaml");
    fs::write(&yaml, "indent-width: [1, 2").unwrap();
    assert!(matches!(
        EditorSettings::load(&yaml).unwrap_err(),
        TyplineError::Settings(SettingsError::Yaml(_))
    ));
}

#[test]
fn test_unsupported_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.ini");
    fs::write(&path, "").unwrap();

    let err = EditorSettings::load(&path).unwrap_err();
    assert!(matches!(err, TyplineError::Settings(SettingsError::UnsupportedFormat { .. })));
    assert!(err.to_string().contains("settings.ini"));
}

#[test]
fn test_errors_carry_diagnostic_codes() {
    use miette::Diagnostic;

    let dir = tempdir().unwrap();
    let err = EditorSettings::default()
        .save(dir.path().join("missing").join("settings.json"))
        .unwrap_err();
    assert!(matches!(err, TyplineError::Settings(SettingsError::Io { .. })));
    assert_eq!(err.code().map(|c| c.to_string()), Some("settings::io".to_string()));
    assert!(err.help().is_some());
}

#[test]
fn test_document_overrides_application_settings() {
    let mut settings = sample_settings();
    let document = EditorSettings::from_mode_line(
        "kate: replace-tabs on; indent-width 2; backup-interval 60",
        ModeSource::Document,
    );
    settings.merge(&document);

    assert_eq!(settings.effective_indent_style(), IndentStyle::Spaces);
    assert_eq!(settings.effective_indent_width(), 2);
    assert_eq!(settings.effective_tab_width(), 8);
    assert_eq!(settings.effective_indent_mode(), IndentMode::Smart);
    assert_eq!(settings.effective_backup_interval(), 3);
}

#[test]
fn test_mode_line_round_trip() {
    let settings = sample_settings();
    let line = settings.to_mode_line();
    assert_eq!(
        line,
        "font DejaVu Sans; font-size 12; indent-mode typst; replace-tabs off; tab-width 8; \
         scheme dark; show-line-numbers none; backup-interval 3;"
    );
    assert_eq!(
        EditorSettings::from_mode_line(&format!("katvan: {line}"), ModeSource::Settings),
        settings
    );
}
