//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了consistent_cache的宏实现，为serde结构体派生 `Record`。

use darling::{ast, FromDeriveInput, FromField};
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, DeriveInput};

#[derive(FromField)]
struct RecordField {
    ident: Option<syn::Ident>,
}

#[derive(FromDeriveInput)]
#[darling(attributes(record), supports(struct_named))]
struct RecordOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: ast::Data<(), RecordField>,
    /// 保存键值的字段
    key: String,
    /// 键字段在数据库中的列名，默认与字段同名
    #[darling(default)]
    column: Option<String>,
    /// 显式表名
    #[darling(default)]
    table: Option<String>,
}

/// 派生 `Record`
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Record)]
/// #[record(key = "id", column = "user_id", table = "users")]
/// struct User { id: u64, name: String }
/// ```
///
/// 负载使用 `JsonCodec` 编解码，键值通过 `ToString` 渲染。
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let opts = match RecordOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let has_key_field = opts
        .data
        .as_ref()
        .take_struct()
        .map(|fields| {
            fields
                .iter()
                .any(|f| f.ident.as_ref().is_some_and(|i| *i == opts.key))
        })
        .unwrap_or(false);
    if !has_key_field {
        return syn::Error::new_spanned(
            &opts.ident,
            format!("#[record(key = \"{}\")] does not name a field", opts.key),
        )
        .to_compile_error()
        .into();
    }

    let ident = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();
    let key_field = format_ident!("{}", opts.key);
    let column = opts.column.clone().unwrap_or_else(|| opts.key.clone());

    let named = opts.table.as_ref().map(|table| {
        quote! {
            impl #impl_generics ::consistent_cache::record::Named for #ident #ty_generics #where_clause {
                fn name(&self) -> &str {
                    #table
                }
            }
        }
    });
    let as_named = opts.table.as_ref().map(|_| {
        quote! {
            fn as_named(&self) -> ::std::option::Option<&dyn ::consistent_cache::record::Named> {
                ::std::option::Option::Some(self)
            }
        }
    });

    let output = quote! {
        impl #impl_generics ::consistent_cache::record::Record for #ident #ty_generics #where_clause {
            fn key_column(&self) -> &str {
                #column
            }

            fn key(&self) -> ::std::string::String {
                ::std::string::ToString::to_string(&self.#key_field)
            }

            fn write(&self) -> ::consistent_cache::error::Result<::std::string::String> {
                ::consistent_cache::serialization::Codec::encode(
                    &::consistent_cache::serialization::JsonCodec,
                    self,
                )
            }

            fn read(&mut self, body: &str) -> ::consistent_cache::error::Result<()> {
                *self = ::consistent_cache::serialization::Codec::decode(
                    &::consistent_cache::serialization::JsonCodec,
                    body,
                )?;
                ::std::result::Result::Ok(())
            }

            #as_named
        }

        #named
    };

    output.into()
}
