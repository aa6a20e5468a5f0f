use crate::config::PLACEHOLDER_NAME;
use crate::error::StudioError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    /// Name of the document (aka include name)
    pub name: String,
    pub content: String,
}

/// Open source documents and the name of the current one.
///
/// The set is never empty: closing the last document recreates an empty placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentSet {
    documents: Vec<Document>,
    current: String,
    placeholder_name: String,
}

impl Default for DocumentSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentSet {
    /// A set holding one empty `"Untitled"` document.
    #[must_use]
    pub fn new() -> Self {
        Self::with_placeholder(PLACEHOLDER_NAME)
    }

    /// A set holding one empty document named `placeholder_name`.
    #[must_use]
    pub fn with_placeholder(placeholder_name: &str) -> Self {
        Self {
            documents: vec![Document {
                name: placeholder_name.to_string(),
                content: String::new(),
            }],
            current: placeholder_name.to_string(),
            placeholder_name: placeholder_name.to_string(),
        }
    }

    /// Open a document. If one with this name is already open, its content is
    /// replaced. Either way it becomes the current document.
    pub fn open(&mut self, name: &str, content: &str) {
        if let Some(doc) = self.get_mut(name) {
            doc.content = content.to_string();
        } else {
            self.documents.push(Document {
                name: name.to_string(),
                content: content.to_string(),
            });
        }
        self.current = name.to_string();
    }

    /// Create an empty document and switch to it. The name is trimmed and gets an
    /// `.asm` extension when it has none. Returns the final name.
    ///
    /// # Errors
    /// Returns [`StudioError::InvalidDocumentName`] for blank names.
    pub fn new_document(&mut self, name: &str) -> Result<String, StudioError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(StudioError::InvalidDocumentName(name.to_string()));
        }

        let name = if trimmed.to_ascii_lowercase().ends_with(".asm") {
            trimmed.to_string()
        } else {
            format!("{trimmed}.asm")
        };
        self.open(&name, "");
        Ok(name)
    }

    /// Snapshot the content of a document (on edit or tab deselection).
    ///
    /// # Errors
    /// Returns [`StudioError::UnknownDocument`] if no such document is open.
    pub fn update(&mut self, name: &str, content: &str) -> Result<(), StudioError> {
        let doc = self
            .get_mut(name)
            .ok_or_else(|| StudioError::UnknownDocument(name.to_string()))?;
        doc.content = content.to_string();
        Ok(())
    }

    pub fn update_current(&mut self, content: &str) {
        let current = self.current_index();
        self.documents[current].content = content.to_string();
    }

    /// Switch the current document.
    ///
    /// # Errors
    /// Returns [`StudioError::UnknownDocument`] if no such document is open.
    pub fn select(&mut self, name: &str) -> Result<(), StudioError> {
        if self.get(name).is_none() {
            return Err(StudioError::UnknownDocument(name.to_string()));
        }
        self.current = name.to_string();
        Ok(())
    }

    /// Close the document with the given name. When the current one is closed, switch
    /// to the first one left (or a fresh placeholder if none is).
    ///
    /// # Errors
    /// Returns [`StudioError::UnknownDocument`] if no such document is open.
    pub fn close(&mut self, name: &str) -> Result<(), StudioError> {
        let index = self
            .documents
            .iter()
            .position(|doc| doc.name == name)
            .ok_or_else(|| StudioError::UnknownDocument(name.to_string()))?;
        self.documents.remove(index);

        if self.documents.is_empty() {
            *self = Self::with_placeholder(&self.placeholder_name);
        } else if self.current == name {
            self.current = self.documents[0].name.clone();
        }
        Ok(())
    }

    /// Empty the current document.
    pub fn clear_current(&mut self) {
        self.update_current("");
    }

    #[must_use]
    pub fn current(&self) -> &Document {
        &self.documents[self.current_index()]
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Document> {
        self.documents.iter_mut().find(|doc| doc.name == name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.documents.iter().map(|doc| doc.name.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Never true, kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    /// Index of the current document. `current` always names a live document, the
    /// fallback to 0 only guards against that invariant being broken.
    fn current_index(&self) -> usize {
        self.documents
            .iter()
            .position(|doc| doc.name == self.current)
            .unwrap_or(0)
    }
}

/// Number of lines shown in the line-number gutter: empty text is one line and every
/// '\n' starts another.
#[must_use]
pub fn line_count(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_set_has_placeholder() {
        let docs = DocumentSet::new();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs.current().name, "Untitled");
        assert_eq!(docs.current().content, "");
    }

    #[test]
    fn test_open_adds_and_selects() {
        // Arrange
        let mut docs = DocumentSet::new();

        // Act
        docs.open("main.asm", "NOP");
        docs.open("lib.asm", "RET");

        // Assert
        assert_eq!(docs.names(), ["Untitled", "main.asm", "lib.asm"]);
        assert_eq!(docs.current().name, "lib.asm");
    }

    #[test]
    fn test_open_existing_replaces_content() {
        // Arrange
        let mut docs = DocumentSet::new();
        docs.open("main.asm", "NOP");
        docs.open("lib.asm", "RET");

        // Act
        docs.open("main.asm", "JMP start");

        // Assert
        assert_eq!(docs.len(), 3);
        assert_eq!(docs.current().name, "main.asm");
        assert_eq!(docs.current().content, "JMP start");
    }

    #[test]
    fn test_new_document_names() {
        // Arrange
        let mut docs = DocumentSet::new();

        // Act & Assert
        assert_eq!(docs.new_document("  timer "), Ok("timer.asm".to_string()));
        assert_eq!(docs.new_document("math.ASM"), Ok("math.ASM".to_string()));
        assert_eq!(
            docs.new_document("   "),
            Err(StudioError::InvalidDocumentName("   ".to_string()))
        );
        assert_eq!(docs.current().name, "math.ASM");
        assert_eq!(docs.current().content, "");
    }

    #[test]
    fn test_update_and_select() {
        // Arrange
        let mut docs = DocumentSet::new();
        docs.open("main.asm", "");
        docs.open("lib.asm", "");

        // Act
        docs.update("main.asm", "ORG 0").unwrap();
        docs.update_current("RET");
        let unknown = docs.select("missing.asm");
        docs.select("main.asm").unwrap();

        // Assert
        assert_eq!(unknown, Err(StudioError::UnknownDocument("missing.asm".to_string())));
        assert_eq!(docs.current().content, "ORG 0");
        assert_eq!(docs.get("lib.asm").map(|d| d.content.as_str()), Some("RET"));
        assert!(docs.update("missing.asm", "").is_err());
    }

    #[test]
    fn test_close_current_switches_to_first() {
        // Arrange
        let mut docs = DocumentSet::new();
        docs.open("main.asm", "");
        docs.open("lib.asm", "");

        // Act
        docs.close("lib.asm").unwrap();

        // Assert
        assert_eq!(docs.current().name, "Untitled");
        assert_eq!(docs.names(), ["Untitled", "main.asm"]);
    }

    #[test]
    fn test_close_other_keeps_current() {
        // Arrange
        let mut docs = DocumentSet::new();
        docs.open("main.asm", "");
        docs.open("lib.asm", "");

        // Act
        docs.close("Untitled").unwrap();

        // Assert
        assert_eq!(docs.current().name, "lib.asm");
        assert!(docs.close("Untitled").is_err());
    }

    #[test]
    fn test_close_last_recreates_placeholder() {
        // Arrange
        let mut docs = DocumentSet::new();
        docs.open("main.asm", "NOP");
        docs.close("Untitled").unwrap();

        // Act
        docs.close("main.asm").unwrap();

        // Assert
        assert_eq!(docs.len(), 1);
        assert_eq!(docs.current(), &Document {
            name: "Untitled".to_string(),
            content: String::new(),
        });
    }

    #[test]
    fn test_clear_current() {
        let mut docs = DocumentSet::with_placeholder("scratch");
        docs.update_current("NOP\nNOP");

        docs.clear_current();

        assert_eq!(docs.current().name, "scratch");
        assert!(docs.current().content.is_empty());
    }

    #[test]
    fn test_line_count() {
        assert_eq!(line_count(""), 1);
        assert_eq!(line_count("NOP"), 1);
        assert_eq!(line_count("NOP\n"), 2);
        assert_eq!(line_count("NOP\r\nRET\nJMP x"), 3);
    }
}
