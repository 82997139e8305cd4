/// Converts a `Result` into an `Option`, logging the error instead of propagating it.
///
/// Used at the boundaries where a failure must not abort the surrounding operation,
/// e.g. an optional directory usage measurement or a background cache refresh.
pub trait ResultOkLogExt<T, E> {
    /// Logs the error at `error` level.
    fn ok_log(self) -> Option<T>;

    /// Logs the error at `warn` level, prefixed with `context`.
    fn ok_warn(self, context: impl std::fmt::Display) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    fn ok_warn(self, context: impl std::fmt::Display) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::warn!("{context}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_log_passes_value_through() {
        let res: Result<u32, std::io::Error> = Ok(7);
        assert_eq!(res.ok_log(), Some(7));
    }

    #[test]
    fn test_ok_warn_discards_error() {
        let res: Result<u32, std::io::Error> = Err(std::io::Error::other("boom"));
        assert_eq!(res.ok_warn("refresh"), None);
    }
}
