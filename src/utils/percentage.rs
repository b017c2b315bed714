use std::{fmt::Display, ops::Deref};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || !value.is_finite() {
            None
        } else {
            Some(Percentage(value))
        }
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// `part / whole` as a percentage. There is no percentage of nothing, so a zero `whole` gives
/// `None`.
pub fn ratio_percentage(part: u64, whole: u64) -> Option<Percentage> {
    if whole == 0 {
        return None;
    }
    Percentage::new_opt(part as f64 / whole as f64 * 100.)
}

/// Share of correct answers. Displays as `N/A` when nothing was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Accuracy(Option<Percentage>);

impl Accuracy {
    pub fn of(correct: u64, attempted: u64) -> Self {
        Self(ratio_percentage(correct, attempted))
    }

    pub fn value(&self) -> Option<Percentage> {
        self.0
    }
}

impl Display for Accuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(v) => v.fmt(f),
            None => write!(f, "N/A"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ratio_percentage, Accuracy};

    #[test]
    fn accuracy_formats_one_decimal() {
        assert_eq!(Accuracy::of(7, 10).to_string(), "70.0%");
        assert_eq!(Accuracy::of(2, 3).to_string(), "66.7%");
    }

    #[test]
    fn accuracy_without_attempts_is_not_available() {
        let accuracy = Accuracy::of(0, 0);
        assert_eq!(accuracy.value(), None);
        assert_eq!(accuracy.to_string(), "N/A");
    }

    #[test]
    fn ratio_of_zero_whole_is_none() {
        assert!(ratio_percentage(5, 0).is_none());
        assert_eq!(*ratio_percentage(1, 4).unwrap(), 25.);
    }
}
