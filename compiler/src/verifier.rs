use crate::types::{EnumDef, StructDef, SymbolTable};
use crate::utils::quote;

/// End-of-parse checks over the populated registries: every forward
/// declaration must have been resolved, and union members must name infos
/// rather than fixed structs.
pub fn verify(
    structs: &SymbolTable<StructDef>,
    enums: &SymbolTable<EnumDef>,
) -> Result<(), String> {
    for def in structs.iter() {
        if def.predecl {
            return Err(format!(
                "The type {} is referenced but never defined",
                quote(&def.name)
            ));
        }
    }
    for enum_def in enums.iter() {
        if !enum_def.is_union {
            continue;
        }
        for val in enum_def.vals.iter() {
            if let Some(struct_index) = val.struct_ref {
                if structs.vec[struct_index].fixed {
                    return Err(format!(
                        "The union element {} must be an info",
                        quote(&val.name)
                    ));
                }
            }
        }
    }
    Ok(())
}
