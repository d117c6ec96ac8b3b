pub(crate) fn resolve_data_dir(cli_value: Option<&str>) -> String {
    match cli_value {
        Some(value) if !value.trim().is_empty() => value.to_string(),
        _ => "./data".to_string(),
    }
}
