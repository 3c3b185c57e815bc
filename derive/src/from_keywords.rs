use std::collections::HashSet;

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Expr, ExprClosure, Field, Fields, Ident, LitStr, Pat, PathArguments,
    Result, Token, Type,
    parse::{Parse, ParseStream},
    spanned::Spanned,
};

pub(crate) fn expand_from_keywords(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        Err(Error::new(
            input.span(),
            "`FromKeywords` may only be derived on structs.",
        ))?
    };

    let Fields::Named(fields) = &data.fields else {
        Err(Error::new(
            input.span(),
            "`FromKeywords` may only be derived on structs with named fields.",
        ))?
    };

    let fields = fields
        .named
        .iter()
        .map(FieldMetadata::parse)
        .map(Result::transpose)
        .flatten() // Skip fields without an attribute.
        .collect::<Result<Vec<_>>>()?;

    let mut tags = HashSet::new();

    for field in &fields {
        if !tags.insert(field.tag.value()) {
            Err(Error::new(field.tag.span(), "Keyword tags must be unique."))?;
        }
    }

    let cases = fields.into_iter().map(|FieldMetadata { name, tag, handler }| {
        let assignment = if let Some((field_type, acc, val, body)) = handler {
            quote! {
                (|#acc: &mut #field_type, #val: &Value| { #body })(&mut self.#name, value)
            }
        } else {
            quote! {
                if let Ok(value) = ::core::convert::TryFrom::try_from(value) {
                    self.#name = Some(value);
                }
            }
        };

        quote! { #tag => { #assignment } }
    });

    let name = &input.ident;

    let expanded = quote! {
        impl FromKeywords for #name {
            fn add_keyword(&mut self, tag: &str, value: &Value) {
                match tag {
                    #(#cases)*
                    _ => {}
                };
            }
        }
    };

    Ok(expanded.into())
}

struct FieldMetadata {
    name: Ident,
    tag: LitStr,
    /// Field type, accumulator and value patterns, and body of a handler.
    handler: Option<(Type, Pat, Pat, Box<Expr>)>,
}

impl FieldMetadata {
    fn parse(field: &Field) -> Result<Option<Self>> {
        let Some(name) = field.ident.clone() else {
            Err(Error::new(field.span(), "Field must be named."))?
        };

        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("keyword")) else {
            return Ok(None);
        };

        let KeywordAttribute { tag, handler } = attr.meta.require_list()?.parse_args()?;

        let handler = match handler {
            Some(handler) => {
                let mut inputs = handler.inputs.iter().map(untyped);

                let (Some(acc), Some(val), None) = (inputs.next(), inputs.next(), inputs.next())
                else {
                    Err(Error::new_spanned(
                        &handler,
                        "Handler closure must have two parameters.",
                    ))?
                };

                Some((field.ty.clone(), acc, val, handler.body.clone()))
            }
            None => {
                require_option(&field.ty)?;
                None
            }
        };

        Ok(Some(Self { name, tag, handler }))
    }
}

/// Strip any type annotation from a closure parameter.
fn untyped(pat: &Pat) -> Pat {
    match pat {
        Pat::Type(pat_type) => (*pat_type.pat).clone(),
        pat => pat.clone(),
    }
}

fn require_option(ty: &Type) -> Result<()> {
    let Type::Path(path) = ty else {
        Err(Error::new_spanned(ty, "Field must have a type annotation."))?
    };

    let Some(segment) = path.path.segments.last() else {
        Err(Error::new_spanned(
            &path.path.segments,
            "Field must have a type annotation.",
        ))?
    };

    if segment.ident != "Option" {
        Err(Error::new_spanned(
            &segment.ident,
            "Field without a handler must have type `Option<T>`.",
        ))?
    }

    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        Err(Error::new_spanned(
            &segment.arguments,
            "Field of type `Option<T>` must have a generic parameter.",
        ))?
    };

    if arguments.args.len() != 1 {
        Err(Error::new_spanned(
            &arguments.args,
            "Field of type `Option<T>` must have a generic parameter.",
        ))?
    }

    Ok(())
}

struct KeywordAttribute {
    tag: LitStr,
    handler: Option<ExprClosure>,
}

impl Parse for KeywordAttribute {
    fn parse(input: ParseStream) -> Result<Self> {
        let tag = input.parse::<LitStr>()?;

        if tag.value().is_empty() {
            Err(Error::new(tag.span(), "Keyword tag must not be empty."))?
        }

        let handler = if !input.is_empty() {
            input.parse::<Token![,]>()?;
            Some(input.parse::<ExprClosure>()?)
        } else {
            None
        };

        Ok(Self { tag, handler })
    }
}
