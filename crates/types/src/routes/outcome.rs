//! Tagged result of one bounded pipeline

/// Result of racing one quote-and-validate pipeline against its deadline
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
	/// The pipeline produced a usable value
	Candidate(T),
	/// The deadline fired first; the underlying work may still be running
	TimedOut,
	/// The pipeline finished without a usable value
	Unavailable,
}

impl<T> Outcome<T> {
	pub fn from_option(value: Option<T>) -> Self {
		match value {
			Some(value) => Outcome::Candidate(value),
			None => Outcome::Unavailable,
		}
	}

	pub fn is_timed_out(&self) -> bool {
		matches!(self, Outcome::TimedOut)
	}

	pub fn candidate(self) -> Option<T> {
		match self {
			Outcome::Candidate(value) => Some(value),
			Outcome::TimedOut | Outcome::Unavailable => None,
		}
	}

	pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
		match self {
			Outcome::Candidate(value) => Outcome::Candidate(f(value)),
			Outcome::TimedOut => Outcome::TimedOut,
			Outcome::Unavailable => Outcome::Unavailable,
		}
	}
}

impl<T> From<Option<T>> for Outcome<T> {
	fn from(value: Option<T>) -> Self {
		Outcome::from_option(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_outcome_conversions() {
		assert_eq!(Outcome::from(Some(3)), Outcome::Candidate(3));
		assert_eq!(Outcome::<u8>::from(None), Outcome::Unavailable);
		assert_eq!(Outcome::Candidate(2).map(|v| v * 2).candidate(), Some(4));
		assert!(Outcome::<u8>::TimedOut.is_timed_out());
		assert_eq!(Outcome::<u8>::TimedOut.candidate(), None);
	}
}
