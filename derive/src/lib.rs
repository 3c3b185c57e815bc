use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod from_keywords;

#[proc_macro_derive(FromKeywords, attributes(keyword))]
pub fn derive_from_keywords(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match from_keywords::expand_from_keywords(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}
