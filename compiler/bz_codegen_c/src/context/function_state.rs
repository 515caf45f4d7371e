//! Per-function emission state.

use bz_ir::{DestructOperation, FuncId, VarId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::value::ExprValue;

/// A pending cleanup, run in reverse push order when its scope closes.
#[derive(Copy, Clone, Debug)]
pub(crate) struct DestructInfo {
    pub op: DestructOperation,
    /// The temporary a self-destruct refers to; [`ExprValue::none`] for
    /// variable and `defer` cleanups.
    pub value: ExprValue,
    /// Only run while this flag is set (a variable's move-destruct
    /// indicator).
    pub condition: Option<ExprValue>,
    /// Cleared after running: the indicator of the variable this
    /// expression moved out of.
    pub move_destruct_indicator: Option<ExprValue>,
    /// Address of the element that was moved out of an rvalue array.
    pub rvalue_array_elem_ptr: Option<ExprValue>,
}

/// Innermost enclosing source loop.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct LoopInfo {
    /// Cleanups at or above this depth belong to the loop body.
    pub destruct_stack_begin: usize,
    /// Inside a C `switch` nested in the loop, where `break` would only
    /// leave the switch.
    pub in_c_switch: bool,
    /// Label after the loop, allocated by the first `break` that needs it.
    pub break_label: Option<u32>,
    /// Label before the iteration expression of a `for` loop.
    pub continue_label: Option<u32>,
    /// `continue` must jump to `continue_label` instead of using C's
    /// `continue`, which would skip the iteration expression.
    pub continue_needs_label: bool,
}

#[derive(Debug, Default)]
pub(crate) struct FunctionState {
    pub func: Option<FuncId>,
    pub body: String,
    pub indent: usize,
    /// Numbers `v_` locals and `l_` labels.
    pub counter: u32,
    /// The last statement emitted cannot fall through.
    pub terminated: bool,
    pub locals: FxHashMap<VarId, ExprValue>,
    pub move_destruct_indicators: FxHashMap<VarId, ExprValue>,
    pub destructs: Vec<DestructInfo>,
    pub loop_info: LoopInfo,
    /// Bound element values of decomposed value operations; index 0 is the
    /// latest.
    pub value_references: SmallVec<[ExprValue; 4]>,
    /// Out-pointer for non-trivially-relocatable return values.
    pub return_address: Option<ExprValue>,
}

impl FunctionState {
    pub fn new(func: FuncId) -> Self {
        FunctionState {
            func: Some(func),
            indent: 1,
            ..FunctionState::default()
        }
    }
}
