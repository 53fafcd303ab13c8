/// Answer to the "continue?" question asked before any network activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Proceed,
    Decline,
    Invalid,
}

pub fn parse_confirmation(answer: &str) -> Confirmation {
    match answer.trim() {
        "Y" | "y" | "Yes" | "yes" => Confirmation::Proceed,
        "N" | "n" | "No" | "no" => Confirmation::Decline,
        _ => Confirmation::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::{Confirmation, parse_confirmation};

    #[test]
    fn recognised_answers() {
        for answer in ["Y", "y", "Yes", "yes", "  yes\n"] {
            assert_eq!(parse_confirmation(answer), Confirmation::Proceed, "{answer:?}");
        }
        for answer in ["   N    ", "n", "No", "   no   "] {
            assert_eq!(parse_confirmation(answer), Confirmation::Decline, "{answer:?}");
        }
    }

    #[test]
    fn anything_else_is_invalid() {
        for answer in ["", "   N o   ", "YES", "nope", "1"] {
            assert_eq!(parse_confirmation(answer), Confirmation::Invalid, "{answer:?}");
        }
    }
}
