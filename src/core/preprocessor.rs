//! Command template token substitution.
//!
//! Argument templates recognize exactly two tokens: `$PROJECTNAME` and
//! `$FILE`. Substitution is pure; a token whose value is empty is left
//! untouched so partially-resolved templates stay inspectable.

pub const TOKEN_PROJECT_NAME: &str = "$PROJECTNAME";
pub const TOKEN_FILE: &str = "$FILE";

#[derive(Debug, Clone)]
pub struct CommandPreprocessor {
    project: String,
}

impl CommandPreprocessor {
    pub fn new(project: impl Into<String>) -> Self {
        CommandPreprocessor {
            project: project.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Substitute tokens in a single template string.
    pub fn process(&self, template: &str, current_file: &str) -> String {
        let mut result = template.to_string();
        if !self.project.is_empty() {
            result = result.replace(TOKEN_PROJECT_NAME, &self.project);
        }
        if !current_file.is_empty() {
            result = result.replace(TOKEN_FILE, current_file);
        }
        result
    }

    /// Substitute tokens across an ordered sequence, preserving order.
    pub fn process_all(&self, templates: &[String], current_file: &str) -> Vec<String> {
        templates
            .iter()
            .map(|template| self.process(template, current_file))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_both_tokens() {
        let preprocessor = CommandPreprocessor::new("demo");
        assert_eq!(
            preprocessor.process("-c $FILE -o $FILE.o", "a.cpp"),
            "-c a.cpp -o a.cpp.o"
        );
        assert_eq!(preprocessor.process("-o $PROJECTNAME", "a.cpp"), "-o demo");
    }

    #[test]
    fn empty_values_leave_tokens_untouched() {
        let preprocessor = CommandPreprocessor::new("");
        assert_eq!(
            preprocessor.process("-o $PROJECTNAME $FILE", ""),
            "-o $PROJECTNAME $FILE"
        );
    }

    #[test]
    fn sequences_keep_their_order() {
        let preprocessor = CommandPreprocessor::new("demo");
        let templates = vec![
            "-Wall".to_string(),
            "-c $FILE".to_string(),
            "-o $PROJECTNAME".to_string(),
        ];
        assert_eq!(
            preprocessor.process_all(&templates, "b.cpp"),
            vec![
                "-Wall".to_string(),
                "-c b.cpp".to_string(),
                "-o demo".to_string()
            ]
        );
    }

    #[test]
    fn unknown_tokens_pass_through() {
        let preprocessor = CommandPreprocessor::new("demo");
        assert_eq!(preprocessor.process("$OUTDIR/$FILE", "a.cpp"), "$OUTDIR/a.cpp");
    }
}
