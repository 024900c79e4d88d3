//! `#[derive(BinaryCodec)]` implementation.
//!
//! Generates `Encode` and `Decode` impls that serialize fields in declaration
//! order. Enums are prefixed with a u8 discriminant; explicit discriminant
//! values (`Variant = 3`) are honored, otherwise variants count up from the
//! previous one starting at zero. The format is deterministic, which the
//! chain relies on for hashing re-encoded values.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DataEnum, DeriveInput, Fields};

pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                named_struct_impl(name, &impl_generics, &ty_generics, where_clause, fields)
            }
            Fields::Unnamed(fields) => {
                tuple_struct_impl(name, &impl_generics, &ty_generics, where_clause, fields)
            }
            Fields::Unit => unit_struct_impl(name, &impl_generics, &ty_generics, where_clause),
        },
        Data::Enum(data) => enum_impl(name, &impl_generics, &ty_generics, where_clause, data),
        Data::Union(_) => {
            syn::Error::new_spanned(&input, "BinaryCodec does not support unions")
                .to_compile_error()
        }
    };

    TokenStream::from(expanded)
}

fn named_struct_impl(
    name: &syn::Ident,
    impl_generics: &syn::ImplGenerics,
    ty_generics: &syn::TypeGenerics,
    where_clause: Option<&syn::WhereClause>,
    fields: &syn::FieldsNamed,
) -> proc_macro2::TokenStream {
    let field_names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();

    let encode_fields = field_names.iter().map(|field| {
        quote! {
            crate::types::encoding::Encode::encode(&self.#field, out);
        }
    });

    let decode_fields = field_names.iter().map(|field| {
        quote! {
            #field: crate::types::encoding::Decode::decode(input)?,
        }
    });

    quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                #(#encode_fields)*
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(input: &mut &[u8]) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                Ok(Self {
                    #(#decode_fields)*
                })
            }
        }
    }
}

fn tuple_struct_impl(
    name: &syn::Ident,
    impl_generics: &syn::ImplGenerics,
    ty_generics: &syn::TypeGenerics,
    where_clause: Option<&syn::WhereClause>,
    fields: &syn::FieldsUnnamed,
) -> proc_macro2::TokenStream {
    let indices: Vec<_> = (0..fields.unnamed.len()).map(syn::Index::from).collect();

    let encode_fields = indices.iter().map(|idx| {
        quote! {
            crate::types::encoding::Encode::encode(&self.#idx, out);
        }
    });

    let decode_fields = indices.iter().map(|_| {
        quote! {
            crate::types::encoding::Decode::decode(input)?,
        }
    });

    quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                #(#encode_fields)*
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(input: &mut &[u8]) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                Ok(Self(
                    #(#decode_fields)*
                ))
            }
        }
    }
}

fn unit_struct_impl(
    name: &syn::Ident,
    impl_generics: &syn::ImplGenerics,
    ty_generics: &syn::TypeGenerics,
    where_clause: Option<&syn::WhereClause>,
) -> proc_macro2::TokenStream {
    quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, _out: &mut S) {}
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(_input: &mut &[u8]) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                Ok(Self)
            }
        }
    }
}

fn enum_impl(
    name: &syn::Ident,
    impl_generics: &syn::ImplGenerics,
    ty_generics: &syn::TypeGenerics,
    where_clause: Option<&syn::WhereClause>,
    data: &DataEnum,
) -> proc_macro2::TokenStream {
    let discriminants = discriminants(data);

    let encode_arms = data
        .variants
        .iter()
        .zip(discriminants.iter())
        .map(|(variant, &tag)| {
            let variant_name = &variant.ident;
            match &variant.fields {
                Fields::Unit => quote! {
                    Self::#variant_name => {
                        crate::types::encoding::Encode::encode(&#tag, out);
                    }
                },
                Fields::Unnamed(fields) => {
                    let bindings: Vec<_> = (0..fields.unnamed.len())
                        .map(|i| quote::format_ident!("f{}", i))
                        .collect();
                    let encode_fields = bindings.iter().map(|binding| {
                        quote! { crate::types::encoding::Encode::encode(#binding, out); }
                    });
                    quote! {
                        Self::#variant_name(#(#bindings),*) => {
                            crate::types::encoding::Encode::encode(&#tag, out);
                            #(#encode_fields)*
                        }
                    }
                }
                Fields::Named(fields) => {
                    let bindings: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
                    let encode_fields = bindings.iter().map(|binding| {
                        quote! { crate::types::encoding::Encode::encode(#binding, out); }
                    });
                    quote! {
                        Self::#variant_name { #(#bindings),* } => {
                            crate::types::encoding::Encode::encode(&#tag, out);
                            #(#encode_fields)*
                        }
                    }
                }
            }
        });

    let decode_arms = data
        .variants
        .iter()
        .zip(discriminants.iter())
        .map(|(variant, &tag)| {
            let variant_name = &variant.ident;
            match &variant.fields {
                Fields::Unit => quote! {
                    #tag => Ok(Self::#variant_name),
                },
                Fields::Unnamed(fields) => {
                    let decode_fields = (0..fields.unnamed.len()).map(|_| {
                        quote! { crate::types::encoding::Decode::decode(input)?, }
                    });
                    quote! {
                        #tag => Ok(Self::#variant_name(#(#decode_fields)*)),
                    }
                }
                Fields::Named(fields) => {
                    let decode_fields = fields.named.iter().map(|f| {
                        let field = &f.ident;
                        quote! { #field: crate::types::encoding::Decode::decode(input)?, }
                    });
                    quote! {
                        #tag => Ok(Self::#variant_name { #(#decode_fields)* }),
                    }
                }
            }
        });

    quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                match self {
                    #(#encode_arms)*
                }
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(input: &mut &[u8]) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                let tag: u8 = crate::types::encoding::Decode::decode(input)?;
                match tag {
                    #(#decode_arms)*
                    _ => Err(crate::types::encoding::DecodeError::InvalidValue),
                }
            }
        }
    }
}

/// Discriminant per variant: explicit value if given, else previous + 1.
fn discriminants(data: &DataEnum) -> Vec<u8> {
    let mut values = Vec::with_capacity(data.variants.len());
    let mut next: u8 = 0;

    for variant in &data.variants {
        let value = match &variant.discriminant {
            Some((_, expr)) => parse_discriminant(expr),
            None => next,
        };
        values.push(value);
        next = value.wrapping_add(1);
    }

    values
}

fn parse_discriminant(expr: &syn::Expr) -> u8 {
    match expr {
        syn::Expr::Lit(lit) => match &lit.lit {
            syn::Lit::Int(int) => int
                .base10_parse::<u8>()
                .expect("enum discriminant must fit in a u8"),
            _ => panic!("enum discriminant must be an integer literal"),
        },
        _ => panic!("enum discriminant must be an integer literal"),
    }
}
