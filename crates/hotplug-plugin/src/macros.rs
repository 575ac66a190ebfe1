//! Convenience macros for plugin development.

/// Exports the registration entry points of a plugin crate.
///
/// Generates the ABI version function and the registration function the
/// dynamic loader looks up, plus a `register` function the host can put
/// into a static catalog when the crate is linked in directly.
///
/// # Example
/// ```rust,ignore
/// export_plugin!(Echo);
/// export_plugin!(Echo, Dice);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($($plugin:ty),+ $(,)?) => {
        /// Registers every plugin type of this crate.
        pub fn register(
            registrar: &mut $crate::discovery::PluginRegistrar,
        ) -> ::std::result::Result<(), $crate::error::PluginError> {
            $(
                registrar.register::<$plugin>();
            )+
            Ok(())
        }

        #[doc(hidden)]
        #[unsafe(no_mangle)]
        pub extern "C" fn hotplug_plugin_api_version() -> u32 {
            $crate::ffi::abi::API_VERSION
        }

        #[doc(hidden)]
        #[unsafe(no_mangle)]
        pub fn hotplug_plugin_register(
            registrar: &mut $crate::discovery::PluginRegistrar,
        ) -> ::std::result::Result<(), $crate::error::PluginError> {
            register(registrar)
        }
    };
}
