use proc_macro2::{Span, TokenStream};
use quote::{quote, quote_spanned};
use syn::{DeriveInput, Index, Type, parse_macro_input};

/// Derive a fixed-layout word serialization for a GPU-visible record.
///
/// Fields are written in declaration order, each one through its own
/// `GpuRecord` implementation. The record size is the sum of its fields' sizes.
#[proc_macro_derive(GpuRecord)]
pub fn derive_gpu_record(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let str = match input.data {
        syn::Data::Struct(s) => s,
        _ => {
            return quote_spanned! {
                Span::call_site() =>
                compile_error!("GpuRecord can only be derived for struct types");
            }
            .into();
        }
    };

    let (types, write, read): (Vec<&Type>, Vec<TokenStream>, TokenStream) = match &str.fields {
        syn::Fields::Named(fields) => {
            let types = fields.named.iter().map(|x| &x.ty).collect();

            let write = fields
                .named
                .iter()
                .map(|x| {
                    let ident = &x.ident;
                    let ty = &x.ty;
                    quote! { <#ty as plsdraw_core::GpuRecord>::write(&self.#ident, writer); }
                })
                .collect();

            let read_fields = fields.named.iter().map(|x| {
                let ident = &x.ident;
                let ty = &x.ty;
                quote! { #ident: <#ty as plsdraw_core::GpuRecord>::read(reader) }
            });

            (types, write, quote! { Self { #(#read_fields),* } })
        }

        syn::Fields::Unnamed(fields) => {
            let types = fields.unnamed.iter().map(|x| &x.ty).collect();

            let write = fields
                .unnamed
                .iter()
                .enumerate()
                .map(|(id, x)| {
                    let id = Index::from(id);
                    let ty = &x.ty;
                    quote! { <#ty as plsdraw_core::GpuRecord>::write(&self.#id, writer); }
                })
                .collect();

            let read_fields = fields.unnamed.iter().map(|x| {
                let ty = &x.ty;
                quote! { <#ty as plsdraw_core::GpuRecord>::read(reader) }
            });

            (types, write, quote! { Self ( #(#read_fields),* ) })
        }

        syn::Fields::Unit => (Vec::new(), Vec::new(), quote! { { let _ = reader; Self } }),
    };

    let write_unused = if write.is_empty() {
        quote! { let _ = writer; }
    } else {
        quote! {}
    };

    quote! {
        impl #impl_generics plsdraw_core::GpuRecord for #name #ty_generics #where_clause {
            const WORDS: usize = 0 #(+ <#types as plsdraw_core::GpuRecord>::WORDS)*;

            fn write(&self, writer: &mut dyn plsdraw_core::RecordWriter) {
                #write_unused
                #(#write)*
            }

            fn read(reader: &mut dyn plsdraw_core::RecordReader) -> Self {
                #read
            }
        }
    }
    .into()
}
