//! Impl block generation.
//!
//! Records get `impl Record` and `impl FieldType`; enumerations get
//! `impl EnumType` and `impl FieldType`. Generated code refers to the
//! runtime crate through absolute `::dictcodec` paths.

use proc_macro2::TokenStream;
use quote::quote;

use crate::ir::{DefaultIR, EnumIR, FieldIR, FieldKind, MemberValue, RecordIR};

/// Generates the impl blocks for records and enumerations.
#[derive(Debug, Default)]
pub struct ImplBlockGenerator;

impl ImplBlockGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_record(&self, record: &RecordIR) -> TokenStream {
        let ident = &record.ident;
        let name = match &record.name {
            Some(name) => quote! { #name },
            None => {
                let type_name = ident.to_string();
                quote! { ::std::concat!(::std::module_path!(), "::", #type_name) }
            }
        };

        let bases = record.bases.iter().map(|base| {
            quote! { .extends(<#base as ::dictcodec::Record>::record_ref()) }
        });
        let fields = record.fields.iter().map(|field| self.field_decl(field));
        let hooks = if record.hooks {
            quote! {
                .with_pre_decode(<Self as ::dictcodec::RecordHooks>::pre_decode)
                .with_post_encode(<Self as ::dictcodec::RecordHooks>::post_encode)
            }
        } else {
            quote! {}
        };

        let to_record = record.fields.iter().filter(|f| f.is_data()).map(|field| {
            let field_ident = &field.ident;
            let field_name = &field.name;
            quote! { .with(#field_name, ::dictcodec::FieldType::to_value(&self.#field_ident)) }
        });
        let from_record = record.fields.iter().map(|field| {
            let field_ident = &field.ident;
            let field_name = &field.name;
            if field.is_data() {
                quote! { #field_ident: ::dictcodec::take_field(&mut record, #field_name)? }
            } else {
                quote! { #field_ident: ::std::default::Default::default() }
            }
        });

        quote! {
            impl ::dictcodec::Record for #ident {
                const NAME: &'static str = #name;

                fn declaration() -> ::std::sync::Arc<::dictcodec::RecordDecl> {
                    static DECLARATION: ::std::sync::OnceLock<::std::sync::Arc<::dictcodec::RecordDecl>> =
                        ::std::sync::OnceLock::new();
                    ::std::sync::Arc::clone(DECLARATION.get_or_init(|| {
                        ::std::sync::Arc::new(
                            ::dictcodec::RecordDecl::new(<Self as ::dictcodec::Record>::NAME)
                                #(#bases)*
                                #(#fields)*
                                #hooks
                                .closed()
                        )
                    }))
                }

                fn to_record(&self) -> ::dictcodec::RecordValue {
                    ::dictcodec::RecordValue::new(<Self as ::dictcodec::Record>::record_ref())
                        #(#to_record)*
                }

                fn from_record(
                    mut record: ::dictcodec::RecordValue,
                ) -> ::std::result::Result<Self, ::dictcodec::ConversionError> {
                    ::std::result::Result::Ok(Self {
                        #(#from_record,)*
                    })
                }
            }

            impl ::dictcodec::FieldType for #ident {
                fn type_expr() -> ::dictcodec::TypeExpr {
                    ::dictcodec::TypeExpr::Record(<Self as ::dictcodec::Record>::record_ref())
                }

                fn to_value(&self) -> ::dictcodec::Value {
                    ::dictcodec::Value::Record(::dictcodec::Record::to_record(self))
                }

                fn from_value(
                    value: ::dictcodec::Value,
                ) -> ::std::result::Result<Self, ::dictcodec::ValueError> {
                    ::dictcodec::record_from_value(value)
                }
            }
        }
    }

    /// The `.field(...)` call declaring one field.
    fn field_decl(&self, field: &FieldIR) -> TokenStream {
        let name = &field.name;
        let ty = &field.ty;

        if field.kind != FieldKind::Data {
            let opaque = quote!(#ty).to_string();
            let marker = match field.kind {
                FieldKind::ClassLevel => quote! { ::dictcodec::FieldMarker::ClassLevel },
                _ => quote! { ::dictcodec::FieldMarker::Data },
            };
            return quote! {
                .field(
                    ::dictcodec::FieldDecl::new(#name, ::dictcodec::TypeExpr::Opaque(#opaque.to_owned()))
                        .with_marker(#marker)
                )
            };
        }

        let type_expr = match &field.strategy {
            Some(strategy) => quote! { ::dictcodec::TypeExpr::strategy(#strategy) },
            None => quote! { <#ty as ::dictcodec::FieldType>::type_expr() },
        };
        let key = if field.key != field.name {
            let key = &field.key;
            quote! { .with_key(#key) }
        } else {
            quote! {}
        };
        let default = match &field.default {
            DefaultIR::None => quote! {},
            DefaultIR::Trait => quote! {
                .with_default_factory(|| {
                    ::dictcodec::FieldType::to_value(&<#ty as ::std::default::Default>::default())
                })
            },
            DefaultIR::Expr(expr) => quote! {
                .with_default_factory(|| {
                    let value: #ty = #expr;
                    ::dictcodec::FieldType::to_value(&value)
                })
            },
        };

        quote! {
            .field(::dictcodec::FieldDecl::new(#name, #type_expr) #key #default)
        }
    }

    pub fn generate_enum(&self, enumeration: &EnumIR) -> TokenStream {
        let ident = &enumeration.ident;
        let name = &enumeration.name;

        let members = enumeration.variants.iter().map(|variant| {
            let member = &variant.name;
            let value = member_value(&variant.value);
            quote! { .member(#member, #value) }
        });
        let to_member = enumeration.variants.iter().map(|variant| {
            let variant_ident = &variant.ident;
            let member = &variant.name;
            let value = member_value(&variant.value);
            quote! { Self::#variant_ident => (#member, #value) }
        });
        let from_member = enumeration.variants.iter().map(|variant| {
            let variant_ident = &variant.ident;
            let member = &variant.name;
            quote! { #member => ::std::option::Option::Some(Self::#variant_ident) }
        });

        quote! {
            impl ::dictcodec::EnumType for #ident {
                fn enum_ref() -> ::dictcodec::EnumRef {
                    static ENUM: ::std::sync::OnceLock<::dictcodec::EnumRef> = ::std::sync::OnceLock::new();
                    ENUM.get_or_init(|| {
                        ::dictcodec::EnumRef::new(::dictcodec::EnumDecl::new(#name) #(#members)*)
                    })
                    .clone()
                }

                fn to_member(&self) -> ::dictcodec::EnumMember {
                    let (member, value): (&str, ::dictcodec::TreeValue) = match self {
                        #(#to_member,)*
                    };
                    ::dictcodec::EnumMember {
                        enum_name: ::std::sync::Arc::from(#name),
                        name: ::std::sync::Arc::from(member),
                        value,
                    }
                }

                fn from_member(member: &::dictcodec::EnumMember) -> ::std::option::Option<Self> {
                    if &*member.enum_name != #name {
                        return ::std::option::Option::None;
                    }
                    match &*member.name {
                        #(#from_member,)*
                        _ => ::std::option::Option::None,
                    }
                }
            }

            impl ::dictcodec::FieldType for #ident {
                fn type_expr() -> ::dictcodec::TypeExpr {
                    ::dictcodec::TypeExpr::Enum(<Self as ::dictcodec::EnumType>::enum_ref())
                }

                fn to_value(&self) -> ::dictcodec::Value {
                    ::dictcodec::Value::Enum(::dictcodec::EnumType::to_member(self))
                }

                fn from_value(
                    value: ::dictcodec::Value,
                ) -> ::std::result::Result<Self, ::dictcodec::ValueError> {
                    ::dictcodec::enum_from_value(value)
                }
            }
        }
    }
}

fn member_value(value: &MemberValue) -> TokenStream {
    match value {
        MemberValue::Text(text) => quote! { ::dictcodec::TreeValue::Text(::std::string::String::from(#text)) },
        MemberValue::Int(int) => quote! { ::dictcodec::TreeValue::Int(#int) },
        MemberValue::Float(float) => quote! { ::dictcodec::TreeValue::Float(#float) },
        MemberValue::Bool(boolean) => quote! { ::dictcodec::TreeValue::Bool(#boolean) },
    }
}
