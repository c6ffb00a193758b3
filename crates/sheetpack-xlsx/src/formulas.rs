//! Shared- and array-formula group tracking.
//!
//! On load, shared formulas arrive in two shapes: a master cell carrying
//! `t="shared"` plus the literal text, the group range, and a group index
//! (`si`), and member cells carrying only the `si`. Members can precede the
//! master in the file, so resolution is deferred until the worksheet has been
//! fully parsed; each member's effective formula is the master's text
//! re-anchored at the member's own offset.
//!
//! On save, grouping is recomputed from scratch: cells whose offset-relative
//! formula shapes match and which form a contiguous rectangle become one
//! group, with the top-left member as the anchor. Only the anchor carries the
//! literal text — every other member is written as an `si` reference.

use std::collections::{HashMap, HashSet};

use sheetpack_model::formula_shift::{adjust, normalize_relative};
use sheetpack_model::{CellRef, FormulaKind, Range, Worksheet};

/// A shared-formula master captured while parsing a worksheet.
#[derive(Clone, Debug)]
pub(crate) struct SharedMaster {
    pub anchor: CellRef,
    pub range: Range,
    pub text: String,
}

/// A member reference waiting for its master.
#[derive(Clone, Debug)]
pub(crate) struct PendingMember {
    pub cell: CellRef,
    pub shared_index: u32,
}

/// Resolve deferred shared-formula members once the whole sheet is parsed.
///
/// Returns the member/index pair of the first orphan (a member whose group
/// has no master), which the caller reports as a referential-integrity
/// failure.
pub(crate) fn resolve_shared_members(
    worksheet: &mut Worksheet,
    masters: &HashMap<u32, SharedMaster>,
    pending: &[PendingMember],
) -> Result<(), PendingMember> {
    for member in pending {
        let Some(master) = masters.get(&member.shared_index) else {
            return Err(member.clone());
        };
        // The master cell itself already holds the literal text.
        if member.cell == master.anchor {
            continue;
        }
        let text = adjust(&master.text, master.anchor, member.cell);
        worksheet.set_formula(member.cell, Some(text));
    }
    Ok(())
}

/// How one formula cell is written to the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum FormulaRole {
    /// Plain `<f>text</f>`.
    Normal,
    /// `<f t="shared" ref="…" si="N">text</f>`.
    SharedAnchor { shared_index: u32, range: Range },
    /// `<f t="shared" si="N"/>` — no literal text.
    SharedMember { shared_index: u32 },
    /// `<f t="array" ref="…">text</f>`.
    ArrayAnchor { range: Range },
    /// Inside an array range: no `<f>` at all, value only.
    ArrayMember,
}

/// The save-side plan: a role for every formula-bearing cell (plus array
/// members, which may be formula-less value cells).
#[derive(Clone, Debug, Default)]
pub(crate) struct FormulaPlan {
    pub roles: HashMap<CellRef, FormulaRole>,
}

impl FormulaPlan {
    pub fn role(&self, cell: CellRef) -> Option<&FormulaRole> {
        self.roles.get(&cell)
    }
}

/// Compute shared/array grouping for one worksheet.
///
/// Shared groups are grown greedily in row-major order: from each ungrouped
/// formula cell, extend right while the normalized shape matches, then extend
/// down row by row while every cell in the column span still matches. The
/// result is deterministic for a given sheet.
pub(crate) fn plan_formulas(worksheet: &Worksheet) -> FormulaPlan {
    let mut plan = FormulaPlan::default();

    // Array formulas first: anchors claim their whole range.
    for (anchor, formula) in worksheet.iter_formula_cells() {
        if let FormulaKind::Array { range } = formula.kind {
            plan.roles.insert(anchor, FormulaRole::ArrayAnchor { range });
            for member in range.iter() {
                if member != anchor {
                    plan.roles.insert(member, FormulaRole::ArrayMember);
                }
            }
        }
    }

    // Normalized shape for every remaining formula cell.
    let mut shapes: HashMap<CellRef, String> = HashMap::new();
    for (cell, formula) in worksheet.iter_formula_cells() {
        if plan.roles.contains_key(&cell) {
            continue;
        }
        shapes.insert(cell, normalize_relative(&formula.text, cell));
    }

    let mut grouped: HashSet<CellRef> = HashSet::new();
    let mut next_shared_index = 0u32;
    let cells_in_order: Vec<CellRef> = worksheet
        .iter_formula_cells()
        .map(|(cell, _)| cell)
        .collect();

    for &cell in &cells_in_order {
        if grouped.contains(&cell) || !shapes.contains_key(&cell) {
            continue;
        }
        let shape = &shapes[&cell];

        let matches = |candidate: CellRef| -> bool {
            !grouped.contains(&candidate) && shapes.get(&candidate) == Some(shape)
        };

        // Extend right.
        let mut width = 1u32;
        while cell
            .offset(0, width as i64)
            .is_some_and(|next| matches(next))
        {
            width += 1;
        }

        // Extend down while the whole row of the span matches.
        let mut height = 1u32;
        'rows: loop {
            for dx in 0..width {
                let Some(candidate) = cell.offset(height as i64, dx as i64) else {
                    break 'rows;
                };
                if !matches(candidate) {
                    break 'rows;
                }
            }
            height += 1;
        }

        let member_count = width * height;
        if member_count < 2 {
            plan.roles.insert(cell, FormulaRole::Normal);
            grouped.insert(cell);
            continue;
        }

        let range = Range::new(
            cell,
            CellRef::new(cell.row + height - 1, cell.col + width - 1),
        );
        let shared_index = next_shared_index;
        next_shared_index += 1;

        for member in range.iter() {
            grouped.insert(member);
            if member == cell {
                plan.roles.insert(
                    member,
                    FormulaRole::SharedAnchor {
                        shared_index,
                        range,
                    },
                );
            } else {
                plan.roles
                    .insert(member, FormulaRole::SharedMember { shared_index });
            }
        }
    }

    plan
}
