//! `weave_plugin!(expr)` implementation.

use proc_macro2::TokenStream;
use quote::quote;

/// Expands to the shared-library ABI entrypoint: a single `extern "C"`
/// function under the well-known exported symbol name, boxing `expr`
/// (anything implementing `weave_runtime::plugin::Plugin`) behind an
/// `Arc<dyn Plugin>` trait object handle.
pub fn expand(input: TokenStream) -> syn::Result<TokenStream> {
    if input.is_empty() {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "weave_plugin! expects a single expression, e.g. weave_plugin!(MyPlugin::new())",
        ));
    }
    let expr: syn::Expr = syn::parse2(input)?;

    Ok(quote! {
        #[unsafe(no_mangle)]
        pub extern "C" fn weave_plugin_entrypoint() -> *mut ::std::ffi::c_void {
            let plugin: ::std::sync::Arc<dyn ::weave_runtime::plugin::Plugin> =
                ::std::sync::Arc::new(#expr);
            ::weave_runtime::plugin::into_entrypoint_handle(plugin)
        }
    })
}
