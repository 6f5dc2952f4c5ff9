//! Config command: show the resolved configuration and where it came from.

use keyledger_config::ResolvedConfig;

use crate::theme::Theme;

/// Print the resolved configuration as TOML, annotated with the layer that
/// set each field.
pub(crate) fn show_config(resolved: &ResolvedConfig) -> anyhow::Result<()> {
    println!("{}", Theme::header("Loaded files"));
    if resolved.loaded_files.is_empty() {
        println!("  {}", Theme::dimmed("(defaults only)"));
    }
    for file in &resolved.loaded_files {
        println!("  {file}");
    }

    println!("\n{}", Theme::header("Resolved configuration"));
    println!("{}", toml::to_string_pretty(&resolved.config)?);

    let mut sources: Vec<_> = resolved.field_sources.iter().collect();
    sources.sort_by(|a, b| a.0.cmp(b.0));
    println!("{}", Theme::header("Field sources"));
    for (field, layer) in sources {
        println!("  {}", Theme::kv(field, &layer.to_string()));
    }
    Ok(())
}
