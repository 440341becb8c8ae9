use std::ops::Range;
use std::sync::Arc;

use log::trace;
use rustc_demangle::demangle;

use crate::dwarf::constants::*;
use crate::dwarf::reader::{check_address_size, to_usize, Reader};
use crate::dwarf::unit::{AttrValue, CompileUnit, Die};
use crate::error::Result;

/// Specification/abstract-origin hops followed before giving up on a name.
const MAX_REFERENCE_HOPS: usize = 8;

/// Finds the unit owning a `.debug_info` offset, for references that leave
/// the current unit.
pub trait UnitLookup {
    fn unit_containing(&self, section_offset: usize) -> Result<Option<Arc<CompileUnit>>>;
}

/// Decodes the `.debug_ranges` list at `offset`.
///
/// Entries are relative to `base`; an entry whose begin is all ones at the
/// address width replaces the base with its end value.
pub fn parse_range_list(
    debug_ranges: &[u8],
    offset: usize,
    address_size: u8,
    base: u64,
) -> Result<Vec<Range<u64>>> {
    check_address_size(address_size, ".debug_ranges", offset)?;
    let mut cur = Reader::at(debug_ranges, ".debug_ranges", offset)?;
    let selection = u64::MAX >> (64 - 8 * u32::from(address_size));
    let mut base = base;
    let mut ranges = Vec::new();
    loop {
        let begin = cur.read_address(address_size)?;
        let end = cur.read_address(address_size)?;
        if begin == 0 && end == 0 {
            break;
        }
        if begin == selection {
            base = end;
        } else {
            ranges.push(base.wrapping_add(begin)..base.wrapping_add(end));
        }
    }
    Ok(ranges)
}

fn subprogram_contains(unit: &CompileUnit, die: &Die, address: u64, debug_ranges: &[u8]) -> Result<bool> {
    if let Some(ranges) = die.value(DW_AT_RANGES) {
        let Some(offset) = ranges.as_u64() else {
            return Ok(false);
        };
        let offset = to_usize(offset, ".debug_info", unit.die_section_offset(die))?;
        let list = parse_range_list(debug_ranges, offset, unit.address_size(), unit.base_address())?;
        return Ok(list.iter().any(|range| range.contains(&address)));
    }

    let Some(low) = die.value(DW_AT_LOW_PC).and_then(AttrValue::as_address) else {
        return Ok(false);
    };
    let Some(high_pc) = die.attr(DW_AT_HIGH_PC) else {
        return Ok(false);
    };
    // DWARF 4 encodes high_pc as a size when it has constant class.
    let high = match high_pc.form.class() {
        Some(FormClass::Address) => high_pc.value.as_address(),
        Some(FormClass::Constant) => high_pc.value.as_u64().map(|size| low.wrapping_add(size)),
        _ => None,
    };
    Ok(high.is_some_and(|high| low <= address && address < high))
}

/// Name of the subprogram in `unit` whose code covers `address`.
///
/// The first matching subprogram decides the answer, even when no name can
/// be recovered for it.
pub fn find_function(
    unit: &Arc<CompileUnit>,
    address: u64,
    debug_ranges: &[u8],
    lookup: &dyn UnitLookup,
) -> Result<Option<String>> {
    for (index, die) in unit.dies().iter().enumerate() {
        if die.tag != DW_TAG_SUBPROGRAM {
            continue;
        }
        if subprogram_contains(unit, die, address, debug_ranges)? {
            trace!("subprogram at {:#x} covers {address:#x}", unit.die_section_offset(die));
            return function_name(unit, index, lookup);
        }
    }
    Ok(None)
}

/// Own name, then the qualified name of the declaration it refers to, then
/// the demangled linkage name.
pub fn function_name(
    unit: &Arc<CompileUnit>,
    index: usize,
    lookup: &dyn UnitLookup,
) -> Result<Option<String>> {
    let Some(die) = unit.die(index) else {
        return Ok(None);
    };
    if let Some(name) = die.name() {
        return Ok(Some(name.to_string()));
    }
    if let Some(name) = qualified_name(unit, index, lookup)? {
        return Ok(Some(name));
    }
    Ok(linkage_name(die))
}

fn linkage_name(die: &Die) -> Option<String> {
    let mangled = die
        .value(DW_AT_LINKAGE_NAME)
        .or_else(|| die.value(DW_AT_MIPS_LINKAGE_NAME))
        .and_then(AttrValue::as_str)?;
    Some(format!("{:#}", demangle(mangled)))
}

/// Follows `DW_AT_specification`/`DW_AT_abstract_origin` to a named entry and
/// prefixes it with its enclosing scopes.
pub fn qualified_name(
    unit: &Arc<CompileUnit>,
    index: usize,
    lookup: &dyn UnitLookup,
) -> Result<Option<String>> {
    let mut unit = Arc::clone(unit);
    let mut index = index;
    for _ in 0..MAX_REFERENCE_HOPS {
        let Some(die) = unit.die(index) else {
            return Ok(None);
        };
        let Some(reference) = die
            .value(DW_AT_SPECIFICATION)
            .or_else(|| die.value(DW_AT_ABSTRACT_ORIGIN))
        else {
            return Ok(None);
        };
        let Some((target_unit, target)) = resolve_reference(&unit, reference, lookup)? else {
            trace!("unresolved reference {reference:?} in unit {:#x}", unit.offset());
            return Ok(None);
        };
        unit = target_unit;
        index = target;

        if let Some(name) = unit.die(index).and_then(Die::name) {
            return Ok(Some(qualify(&unit, index, name)));
        }
    }
    Ok(None)
}

fn resolve_reference(
    unit: &Arc<CompileUnit>,
    value: &AttrValue,
    lookup: &dyn UnitLookup,
) -> Result<Option<(Arc<CompileUnit>, usize)>> {
    match *value {
        AttrValue::UnitRef(offset) => Ok(unit
            .die_index_at_unit_offset(offset)
            .map(|index| (Arc::clone(unit), index))),
        AttrValue::SectionRef(offset) => {
            if unit.header().contains(offset) {
                return Ok(unit
                    .die_index_at_section_offset(offset)
                    .map(|index| (Arc::clone(unit), index)));
            }
            let Some(other) = lookup.unit_containing(offset)? else {
                return Ok(None);
            };
            Ok(other
                .die_index_at_section_offset(offset)
                .map(|index| (other, index)))
        }
        _ => Ok(None),
    }
}

fn is_scope(tag: DwTag) -> bool {
    matches!(
        tag,
        DW_TAG_CLASS_TYPE | DW_TAG_STRUCTURE_TYPE | DW_TAG_UNION_TYPE | DW_TAG_NAMESPACE
    )
}

/// `outer::inner::name`, from the named class and namespace scopes around `index`.
fn qualify(unit: &CompileUnit, index: usize, name: &str) -> String {
    let mut scopes: Vec<&str> = unit
        .ancestors(index)
        .filter(|die| is_scope(die.tag))
        .filter_map(Die::name)
        .collect();
    scopes.reverse();
    scopes.push(name);
    scopes.join("::")
}
