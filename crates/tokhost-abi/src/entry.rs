use core::fmt;

/// Export names the module must provide. Host looks them up by name on every call.
pub const ENTRY_TOKENIZE: &str = "tokenize";
pub const ENTRY_DETOKENIZE: &str = "detokenize";
pub const ENTRY_CHAT_TEMPLATE: &str = "chat_template";

/// One of the module's callable entry points.
///
/// Each takes a single encoded request buffer and answers with a single
/// response buffer (or an error signal from the module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    Tokenize,
    Detokenize,
    ChatTemplate,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 3] = [
        EntryPoint::Tokenize,
        EntryPoint::Detokenize,
        EntryPoint::ChatTemplate,
    ];

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            EntryPoint::Tokenize => ENTRY_TOKENIZE,
            EntryPoint::Detokenize => ENTRY_DETOKENIZE,
            EntryPoint::ChatTemplate => ENTRY_CHAT_TEMPLATE,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for entry in EntryPoint::ALL {
            assert_eq!(EntryPoint::from_name(entry.name()), Some(entry));
        }
        assert_eq!(EntryPoint::from_name("evaluate"), None);
        assert_eq!(EntryPoint::ChatTemplate.to_string(), "chat_template");
    }
}
