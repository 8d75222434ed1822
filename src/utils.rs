use std::fmt;

/// Represents either a static or owned string
#[derive(Debug, Clone)]
pub enum Soo {
    Static(&'static str),
    Owned(String),
}

impl Soo {
    pub fn as_str(&self) -> &str {
        match self {
            Soo::Static(s) => s,
            Soo::Owned(s) => s,
        }
    }
}

/// Compares the text, whichever way it is stored.
impl PartialEq for Soo {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Soo {}

impl fmt::Display for Soo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::convert::From<&'static str> for Soo {
    fn from(item: &'static str) -> Self {
        Soo::Static(item)
    }
}

impl std::convert::From<String> for Soo {
    fn from(item: String) -> Self {
        Soo::Owned(item)
    }
}

#[cfg(test)]
mod tests {
    use super::Soo;

    #[test]
    fn static_and_owned_compare_by_text() {
        let owned: Soo = format!("Expect {} name.", "method").into();
        assert_eq!(owned.as_str(), "Expect method name.");
        assert_eq!(Soo::from("x").to_string(), "x");
        assert_eq!(Soo::from("x"), Soo::from("x".to_owned()));
        assert_eq!(Soo::from("Expect method name."), owned);
        assert_ne!(Soo::from("x"), Soo::from("y".to_owned()));
    }
}
