use crate::core::errors::ForumError;

/// Banned-word filter applied to user supplied names.
#[derive(Clone, Debug, Default)]
pub struct Censor {
    banned: Vec<String>,
}

impl Censor {
    pub fn new<I, W>(words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        let banned = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Censor { banned }
    }

    /// Fails with [`ForumError::CensorNotPassed`] when `text` contains a banned word.
    pub fn check(&self, field: &str, text: &str) -> Result<(), ForumError> {
        let text = text.to_lowercase();
        match self.banned.iter().find(|w| text.contains(w.as_str())) {
            Some(word) => {
                tracing::warn!(field, word = %word, "Rejected banned word");
                Err(ForumError::CensorNotPassed(field.to_string()))
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_insensitively_inside_words() {
        let censor = Censor::new(["Spam", " ", "casino"]);
        assert!(matches!(censor.check("username", "BigSPAMmer"), Err(ForumError::CensorNotPassed(f)) if f == "username"));
        assert!(censor.check("name", "my-casino.png").is_err());
        assert!(censor.check("name", "holiday.png").is_ok());
    }

    #[test]
    fn empty_censor_accepts_everything() {
        assert!(Censor::default().check("username", "anything").is_ok());
    }
}
