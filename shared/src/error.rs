use thiserror::Error;

/// Failure to turn a row of the widget's event table into a [`crate::Reservation`].
///
/// `row` is the zero-based position of the offending `<tr>` within the fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The row does not have the cells or label layout the widget normally renders.
    /// Nothing else in the same fragment can be trusted after this.
    #[error("row {row}: malformed row: {reason}")]
    FragmentShape { row: usize, reason: String },
    /// The slot label carries no recognisable `<time> to <time>` range.
    #[error("row {row}: unrecognised time range {label:?}")]
    TimeRange { row: usize, label: String },
}

impl ParseError {
    pub fn row(&self) -> usize {
        match self {
            ParseError::FragmentShape { row, .. } | ParseError::TimeRange { row, .. } => *row,
        }
    }

    pub(crate) fn shape(row: usize, reason: impl Into<String>) -> Self {
        ParseError::FragmentShape {
            row,
            reason: reason.into(),
        }
    }
}
