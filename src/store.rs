use crate::flag::Flag;
use crate::flag_value::FlagValue;

/// Store is an interface for anything that holds feature flags by name.
///
/// The main implementation is [crate::FlagSet], the immutable snapshot a [crate::FlagClient]
/// serves from.
pub trait Store {
    /// Retrieve the flag named `name`.
    fn flag(&self, name: &str) -> Option<&Flag>;

    /// Evaluate the flag named `name` for `context`. Unknown flags are off.
    fn is_enabled(&self, name: &str, context: Option<&FlagValue>) -> bool {
        self.flag(name)
            .map(|flag| flag.is_enabled(context))
            .unwrap_or(false)
    }
}
