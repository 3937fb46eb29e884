extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as Tokens;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

const DEFAULT_FILTER: &str = "csr_reconcile=trace";
const FILTER_ENV: &str = "CSR_RECONCILE_LOG";

/// Wraps a test so that a compact subscriber is installed once per test binary.
///
/// The filter is read from `CSR_RECONCILE_LOG` and falls back to
/// `csr_reconcile=trace`. The crate under test must expose a
/// `static INIT: std::sync::Once` at its root.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as ItemFn);
    try_test(attr, item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn try_test(attr: TokenStream, input: ItemFn) -> syn::Result<Tokens> {
    let inner_test = if attr.is_empty() {
        quote! { std::prelude::v1::test }
    } else {
        attr.into()
    };

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;

    let init_tracing = quote! {
        crate::INIT.call_once(|| {
            let filter = tracing_subscriber::EnvFilter::try_from_env(#FILTER_ENV)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(#DEFAULT_FILTER));
            let _ = tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .with_test_writer()
                .without_time()
                .with_line_number(false)
                .try_init();
        })
    };

    let result = quote! {
      #[#inner_test]
      #(#attrs)*
      #vis #sig {
        mod init_test_tracing {
          pub fn init() {
            #init_tracing
          }
        }
        init_test_tracing::init();
        #block
      }
    };
    Ok(result)
}
