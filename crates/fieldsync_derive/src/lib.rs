use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, parse_macro_input};

#[proc_macro_derive(FormValues)]
pub fn derive_form_values(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            input.ident,
            "FormValues derive currently supports only non-generic structs",
        )
        .to_compile_error()
        .into();
    }

    let model_ident = input.ident;
    let fields_struct_ident = format_ident!("{model_ident}Fields");

    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return syn::Error::new(
                    Span::call_site(),
                    "FormValues derive requires a struct with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new(
                Span::call_site(),
                "FormValues derive is only supported on structs",
            )
            .to_compile_error()
            .into();
        }
    };

    let root = fieldsync_path();
    let mut key_exprs = Vec::new();
    let mut read_arms = Vec::new();
    let mut write_arms = Vec::new();
    let mut fields_methods = Vec::new();

    for field in named_fields {
        let Some(field_ident) = field.ident else {
            continue;
        };
        let field_ty = field.ty;
        let field_name = field_ident.to_string();

        key_exprs.push(quote! {
            #root::form::FieldKey::new(#field_name)
        });

        read_arms.push(quote! {
            #field_name => ::std::option::Option::Some(
                <#field_ty as #root::form::FieldType>::to_value(&self.#field_ident)
            ),
        });

        write_arms.push(quote! {
            #field_name => match <#field_ty as #root::form::FieldType>::from_value(value) {
                ::std::option::Option::Some(next) => {
                    self.#field_ident = next;
                    true
                }
                ::std::option::Option::None => false,
            },
        });

        fields_methods.push(quote! {
            pub const fn #field_ident(&self) -> #root::form::FieldKey {
                #root::form::FieldKey::new(#field_name)
            }
        });
    }

    quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #fields_struct_ident;

        impl #fields_struct_ident {
            #(#fields_methods)*
        }

        impl #root::form::FormValues for #model_ident {
            type Fields = #fields_struct_ident;

            fn fields() -> Self::Fields {
                #fields_struct_ident
            }

            fn field_keys(&self) -> ::std::vec::Vec<#root::form::FieldKey> {
                ::std::vec![#(#key_exprs),*]
            }

            fn field(
                &self,
                key: #root::form::FieldKey,
            ) -> ::std::option::Option<#root::form::FieldValue> {
                match key.as_str() {
                    #(#read_arms)*
                    _ => ::std::option::Option::None,
                }
            }

            fn set_field(
                &mut self,
                key: #root::form::FieldKey,
                value: #root::form::FieldValue,
            ) -> bool {
                match key.as_str() {
                    #(#write_arms)*
                    _ => {
                        let _ = value;
                        false
                    }
                }
            }
        }
    }
    .into()
}

fn fieldsync_path() -> TokenStream2 {
    match crate_name("fieldsync") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::fieldsync),
    }
}
