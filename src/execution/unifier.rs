//! Argument type unification.
//!
//! Kernels are written for one element type per role: all inputs share a
//! type and all outputs share a type. Before an invocation the unifier
//! partitions the array arguments by role and, for every role whose members
//! disagree, swaps each non-float member for a float temporary. Input
//! temporaries are filled with a converting copy of the original. After the
//! kernel ran, output temporaries are copied back into their originals with
//! the usual narrowing, and every temporary is released.
//!
//! Invocations with fewer than [`MIN_UNIFIED_ARGUMENTS`] entries are passed
//! through untouched, whatever their types.

use crate::core::args::{ArgumentRole, KernelArgs};
use crate::core::context::ComputeContext;
use crate::core::error::DispatchResult;
use crate::core::types::{DeviceArray, ElementType};
use crate::execution::temporaries::TemporaryArrays;
use crate::kernels::duplication::dispatch_copy;
use log::{debug, warn};

/// Invocations with fewer entries than this are never unified.
pub const MIN_UNIFIED_ARGUMENTS: usize = 3;

/// One argument the unifier will swap for a float temporary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPromotion {
    /// Parameter name
    pub name: String,
    /// Role derived from the name
    pub role: ArgumentRole,
    /// Element type of the original array
    pub from: ElementType,
}

/// Decide which arguments need a float temporary.
///
/// Pure function over the argument map; no device work is done.
pub fn plan(args: &KernelArgs) -> Vec<PlannedPromotion> {
    if args.len() < MIN_UNIFIED_ARGUMENTS {
        return Vec::new();
    }

    let mut promotions = Vec::new();
    for role in [ArgumentRole::Input, ArgumentRole::Output] {
        let members: Vec<(&str, &DeviceArray)> = args
            .arrays()
            .filter(|(name, _)| ArgumentRole::of(name) == role)
            .collect();
        if members.len() < 2 {
            continue;
        }
        let first = members[0].1.element_type();
        if members.iter().all(|(_, array)| array.element_type() == first) {
            continue;
        }
        promotions.extend(
            members
                .into_iter()
                .filter(|(_, array)| array.element_type() != ElementType::UNIFIED)
                .map(|(name, array)| PlannedPromotion {
                    name: name.to_string(),
                    role,
                    from: array.element_type(),
                }),
        );
    }
    promotions
}

struct Replacement {
    role: ArgumentRole,
    original: DeviceArray,
    temporary: DeviceArray,
}

/// Unification state of one invocation.
pub struct TypeUnifier<'a> {
    ctx: &'a ComputeContext,
    temporaries: TemporaryArrays<'a>,
    replacements: Vec<Replacement>,
}

impl<'a> TypeUnifier<'a> {
    /// Create a unifier with nothing replaced yet.
    pub fn new(ctx: &'a ComputeContext) -> Self {
        Self {
            ctx,
            temporaries: TemporaryArrays::new(ctx),
            replacements: Vec::new(),
        }
    }

    /// Number of arguments currently replaced.
    pub fn replaced(&self) -> usize {
        self.replacements.len()
    }

    /// Replace mismatched arguments in `args` with float temporaries.
    pub fn fix(&mut self, args: &mut KernelArgs) -> DispatchResult<()> {
        for promotion in plan(args) {
            let Some(original) = args.get_array(&promotion.name).cloned() else {
                continue;
            };
            let temporary =
                self.temporaries
                    .allocate(*original.shape(), ElementType::UNIFIED, original.kind())?;
            if promotion.role == ArgumentRole::Input {
                dispatch_copy(self.ctx, &original, &temporary)?;
            }
            debug!(
                "unify {} '{}': {} -> {}",
                promotion.role, promotion.name, promotion.from, ElementType::UNIFIED
            );
            args.replace_array(&promotion.name, temporary.clone());
            self.replacements.push(Replacement {
                role: promotion.role,
                original,
                temporary,
            });
        }
        Ok(())
    }

    /// Copy outputs back (if `copy_back`) and release every temporary.
    ///
    /// Temporaries are released even if a copy-back fails; the first error
    /// is returned.
    pub fn unfix(self, copy_back: bool) -> DispatchResult<()> {
        let mut result = Ok(());
        if copy_back {
            for replacement in &self.replacements {
                if replacement.role != ArgumentRole::Output {
                    continue;
                }
                if let Err(error) = dispatch_copy(self.ctx, &replacement.temporary, &replacement.original) {
                    result = Err(error);
                    break;
                }
            }
        }
        let released = self.temporaries.release_all();
        result.and(released)
    }

    /// Unify, execute and restore one invocation.
    pub fn execute(ctx: &ComputeContext, file: &str, symbol: &str, mut args: KernelArgs) -> DispatchResult<()> {
        let mut unifier = TypeUnifier::new(ctx);
        unifier.fix(&mut args)?;

        match ctx.execute_direct(file, symbol, &args) {
            Ok(()) => unifier.unfix(true),
            Err(error) => {
                if let Err(cleanup) = unifier.unfix(false) {
                    warn!("cleanup after failed {} also failed: {}", symbol, cleanup);
                }
                Err(error)
            }
        }
    }
}
