// file: src/utils/template.rs
// description: placeholder substitution for stage command arguments
// reference: Internal code standards

use std::collections::BTreeMap;
use std::path::Path;

/// A set of `{name}` placeholders and the values they expand to.
#[derive(Debug, Clone, Default)]
pub struct ArgTemplate {
    values: BTreeMap<String, String>,
}

impl ArgTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn with_path(self, key: &str, path: &Path) -> Self {
        let value = path.display().to_string();
        self.with_value(key, value)
    }

    pub fn render(&self, arg: &str) -> String {
        let mut result = arg.to_string();

        for (key, value) in &self.values {
            let placeholder = format!("{{{}}}", key);
            result = result.replace(&placeholder, value);
        }

        result
    }

    pub fn render_all(&self, args: &[String]) -> Vec<String> {
        args.iter().map(|arg| self.render(arg)).collect()
    }

    /// Placeholder names in `arg` that this template has no value for.
    pub fn unresolved(&self, arg: &str) -> Vec<String> {
        let mut missing = Vec::new();
        let mut rest = arg;

        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                break;
            };
            let name = &after[..close];
            let shell_expansion = rest[..open].ends_with('$');
            let is_identifier =
                !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if is_identifier && !shell_expansion && !self.values.contains_key(name) {
                missing.push(name.to_string());
            }
            rest = &after[close + 1..];
        }

        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let template = ArgTemplate::new()
            .with_value("subject_count", "3")
            .with_path("text_dir", Path::new("/out/text_files"));

        assert_eq!(
            template.render("--dir={text_dir}/{text_dir}"),
            "--dir=/out/text_files//out/text_files"
        );
        assert_eq!(template.render("{subject_count}"), "3");
        assert_eq!(template.render("plain"), "plain");
    }

    #[test]
    fn test_render_all_keeps_argument_boundaries() {
        let template = ArgTemplate::new().with_path("sid_file", Path::new("/data/my sids.txt"));
        let args = vec!["--sid".to_string(), "{sid_file}".to_string()];

        assert_eq!(
            template.render_all(&args),
            vec!["--sid".to_string(), "/data/my sids.txt".to_string()]
        );
    }

    #[test]
    fn test_unresolved_placeholders() {
        let template = ArgTemplate::new().with_value("text_dir", "/t");

        assert!(template.unresolved("{text_dir}").is_empty());
        assert_eq!(template.unresolved("{sid_file} {text_dir}"), vec!["sid_file"]);
        // shell braces and json are not placeholders
        assert!(template.unresolved("${HOME} {\"a\": 1}").is_empty());
    }
}
