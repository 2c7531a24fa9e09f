//! Type rendering for diagnostics.

use rill_ir::{StringInterner, TypeId};

use super::Pool;
use crate::Tag;

const MAX_DEPTH: u32 = 8;

/// Render a type to a human-readable string.
///
/// Recursion is depth-limited; anything deeper renders as `...`. Good
/// enough for error messages, which is all this is for.
pub fn format_type(pool: &Pool, interner: &StringInterner, ty: TypeId) -> String {
    let mut out = String::new();
    write_type(pool, interner, ty, MAX_DEPTH, &mut out);
    out
}

fn write_type(pool: &Pool, interner: &StringInterner, ty: TypeId, depth: u32, out: &mut String) {
    use std::fmt::Write;

    if ty.is_none() {
        out.push_str("<unresolved>");
        return;
    }
    if depth == 0 {
        out.push_str("...");
        return;
    }
    if let Some(name) = ty.name() {
        out.push_str(name);
        return;
    }

    let d = depth - 1;
    match pool.tag(ty) {
        Tag::List => {
            out.push('[');
            write_type(pool, interner, pool.elem(ty), d, out);
            out.push(']');
        }
        Tag::Set => {
            out.push('{');
            write_type(pool, interner, pool.elem(ty), d, out);
            out.push('}');
        }
        Tag::Reference => {
            out.push('&');
            write_type(pool, interner, pool.elem(ty), d, out);
        }
        Tag::Negation => {
            out.push('!');
            write_type(pool, interner, pool.elem(ty), d, out);
        }
        Tag::Map => {
            out.push('{');
            write_type(pool, interner, pool.map_key(ty), d, out);
            out.push_str("=>");
            write_type(pool, interner, pool.map_value(ty), d, out);
            out.push('}');
        }
        Tag::Tuple => {
            out.push('(');
            for (i, e) in pool.tuple_elems(ty).iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(pool, interner, *e, d, out);
            }
            out.push(')');
        }
        Tag::Record => {
            out.push('{');
            for (i, (name, fty)) in pool.record_fields(ty).iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(pool, interner, *fty, d, out);
                out.push(' ');
                out.push_str(interner.resolve(*name));
            }
            if pool.record_is_open(ty) {
                out.push_str(", ...");
            }
            out.push('}');
        }
        Tag::Function | Tag::Method => {
            out.push_str(if pool.tag(ty) == Tag::Function {
                "function("
            } else {
                "method("
            });
            for (i, p) in pool.fn_params(ty).iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(pool, interner, *p, d, out);
            }
            out.push_str(") => ");
            write_type(pool, interner, pool.fn_ret(ty), d, out);
            let throws = pool.fn_throws(ty);
            if throws != TypeId::VOID {
                out.push_str(" throws ");
                write_type(pool, interner, throws, d, out);
            }
        }
        Tag::Union | Tag::Intersection => {
            let sep = if pool.tag(ty) == Tag::Union { "|" } else { "&" };
            for (i, c) in pool.connective_children(ty).iter().enumerate() {
                if i > 0 {
                    out.push_str(sep);
                }
                write_type(pool, interner, *c, d, out);
            }
        }
        Tag::Nominal => {
            out.push_str(interner.resolve(pool.nominal_name(ty)));
        }
        tag => {
            let _ = write!(out, "<{tag:?}>");
        }
    }
}
