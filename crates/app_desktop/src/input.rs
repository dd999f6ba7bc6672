use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use core_types::FileUpload;

/// Every editable box in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Email,
    Password,
    KbName,
    KbDescription,
    PdfPath,
    Url,
    TextTitle,
    TextContent,
    AgentName,
    AgentDescription,
    GreetingPrompt,
    MessagePrompt,
    PromptPdfPath,
    AvatarPath,
    ChatInput,
    NewPassword,
    ConfirmPassword,
}

impl Field {
    pub fn placeholder(self) -> &'static str {
        match self {
            Field::Email => "you@example.com",
            Field::Password | Field::NewPassword => "Password",
            Field::ConfirmPassword => "Confirm password",
            Field::KbName => "Knowledge base name",
            Field::KbDescription => "Description (optional)",
            Field::PdfPath | Field::PromptPdfPath => "Path to a .pdf file",
            Field::Url => "https://example.com",
            Field::TextTitle => "Title",
            Field::TextContent => "Content",
            Field::AgentName => "Agent name",
            Field::AgentDescription => "Description (optional)",
            Field::GreetingPrompt => "Greeting prompt",
            Field::MessagePrompt => "Message prompt",
            Field::AvatarPath => "Path to an image",
            Field::ChatInput => "Type your message...",
        }
    }

    pub fn is_secret(self) -> bool {
        matches!(
            self,
            Field::Password | Field::NewPassword | Field::ConfirmPassword
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Edited,
    Submit(Field),
    Ignored,
}

/// Text buffers for all fields plus the one holding keyboard focus.
#[derive(Debug, Default)]
pub struct Form {
    values: HashMap<Field, String>,
    focus: Option<Field>,
}

impl Form {
    pub fn focus(&mut self, field: Field) {
        self.focus = Some(field);
    }

    pub fn blur(&mut self) {
        self.focus = None;
    }

    pub fn focused(&self) -> Option<Field> {
        self.focus
    }

    pub fn value(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or_default()
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn clear(&mut self, field: Field) {
        self.values.remove(&field);
    }

    /// Text to draw for a field; secrets are masked.
    pub fn display(&self, field: Field) -> String {
        let value = self.value(field);
        if field.is_secret() {
            "•".repeat(value.chars().count())
        } else {
            value.to_owned()
        }
    }

    /// Applies one key press to the focused field. `key` is the platform key
    /// name, `key_char` the text it produces, if any.
    pub fn apply_key(&mut self, key: &str, key_char: Option<&str>, modified: bool) -> KeyOutcome {
        let Some(field) = self.focus else {
            return KeyOutcome::Ignored;
        };
        match key {
            "enter" => KeyOutcome::Submit(field),
            "escape" => {
                self.focus = None;
                KeyOutcome::Edited
            }
            "backspace" => {
                self.values.entry(field).or_default().pop();
                KeyOutcome::Edited
            }
            _ if modified => KeyOutcome::Ignored,
            "space" => {
                self.values.entry(field).or_default().push(' ');
                KeyOutcome::Edited
            }
            _ => match key_char.filter(|text| !text.chars().any(char::is_control)) {
                Some(text) => {
                    self.values.entry(field).or_default().push_str(text);
                    KeyOutcome::Edited
                }
                None => KeyOutcome::Ignored,
            },
        }
    }
}

/// Reads a picked file into memory, guessing its type from the extension.
pub fn read_upload(path: &str) -> Result<FileUpload> {
    let path = Path::new(path.trim());
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("file path has no name")?
        .to_owned();
    let content_type = FileUpload::guess_content_type(&file_name);
    Ok(FileUpload::new(file_name, content_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_goes_to_the_focused_field() {
        let mut form = Form::default();
        assert_eq!(form.apply_key("a", Some("a"), false), KeyOutcome::Ignored);

        form.focus(Field::Url);
        for key in ["h", "i"] {
            form.apply_key(key, Some(key), false);
        }
        form.apply_key("space", None, false);
        form.apply_key("x", Some("x"), false);
        form.apply_key("backspace", None, false);
        assert_eq!(form.value(Field::Url), "hi ");

        assert_eq!(form.apply_key("c", Some("c"), true), KeyOutcome::Ignored);
        assert_eq!(
            form.apply_key("enter", None, false),
            KeyOutcome::Submit(Field::Url)
        );
        form.apply_key("escape", None, false);
        assert_eq!(form.focused(), None);
    }

    #[test]
    fn secrets_are_masked() {
        let mut form = Form::default();
        form.set(Field::Password, "hunter2");
        assert_eq!(form.display(Field::Password), "•••••••");
        form.set(Field::Email, "a@b.c");
        assert_eq!(form.display(Field::Email), "a@b.c");
        form.clear(Field::Email);
        assert_eq!(form.value(Field::Email), "");
    }

    #[test]
    fn reads_uploads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.pdf");
        fs::write(&path, b"%PDF-1.7").expect("write");

        let upload = read_upload(path.to_str().expect("utf8")).expect("read");
        assert_eq!(upload.file_name, "report.pdf");
        assert!(upload.is_pdf());
        assert_eq!(upload.size(), 8);
        assert!(read_upload("/definitely/missing.pdf").is_err());
    }
}
