//! The tree walker: one `eval_term` dispatch over [`TermKind`].

use newlang_parser::{AssignKind, Term, TermKind, TypeAnnotation};

use crate::error::NlError;
use crate::object::{
    Dim, DictData, Fraction, IterData, IterStep, Object, Payload, RangeData, Scalar, Tensor,
    TypeValue,
};
use crate::types::{predicate, NlType, ScalarKind};

use super::{EvalResult, FrameKind, Interpreter, Unwind};

impl Interpreter {
    pub(crate) fn eval_term(&mut self, term: &Term) -> EvalResult {
        match term.kind {
            TermKind::Integer
            | TermKind::Number
            | TermKind::Fraction
            | TermKind::StrChar
            | TermKind::StrWide => Ok(self.literal(term)?),
            TermKind::None => Ok(Object::none()),
            TermKind::Ellipsis => Ok(Object::ellipsis()),
            // Raw source blocks carry foreign text for other backends;
            // the evaluator passes over them.
            TermKind::Source => Ok(Object::none()),
            TermKind::Eval => self.eval_backquote(term),
            TermKind::Name | TermKind::Local | TermKind::Module | TermKind::Native => {
                self.resolve_name(term)
            }
            TermKind::Argument => self.eval_argument(term),
            TermKind::ArgsDict => Ok(self.context_listing()),
            TermKind::TypeName => self.eval_type_name(term),
            TermKind::Call => self.eval_call(term),
            TermKind::TypeCall => self.eval_type_call(term),
            TermKind::Index => self.eval_index(term),
            TermKind::Field => self.eval_field(term),
            TermKind::Operator => self.eval_operator(term),
            TermKind::UnaryOp => self.eval_unary(term),
            TermKind::Range => self.eval_range(term),
            TermKind::Dict => self.eval_dict_literal(term),
            TermKind::Tensor => self.eval_tensor_literal(term),
            TermKind::Block
            | TermKind::BlockTry
            | TermKind::BlockAnd
            | TermKind::BlockOr
            | TermKind::BlockXor => self.eval_block(term),
            TermKind::Assign => self.eval_assign(term),
            TermKind::Follow => self.eval_follow(term),
            TermKind::Repeat => self.eval_repeat(term),
            TermKind::Return => {
                let value = match &term.left {
                    Some(expr) => self.eval_term(expr)?,
                    None => Object::none(),
                };
                Err(Unwind::Return(value))
            }
            TermKind::Break => {
                let value = match &term.left {
                    Some(expr) => self.eval_term(expr)?,
                    None => Object::none(),
                };
                Err(Unwind::Break(value))
            }
            TermKind::Iterator => self.eval_iterator_op(term),
            TermKind::MacroDef => {
                self.register_macro_def(term)?;
                Ok(Object::none())
            }
        }
    }

    // ==================== literals ====================

    fn literal(&self, term: &Term) -> Result<Object, NlError> {
        match term.kind {
            TermKind::Integer => {
                let value: i64 = term
                    .text
                    .parse()
                    .map_err(|_| NlError::value(format!("bad integer literal '{}'", term.text)))?;
                // A literal's annotation narrows its current kind;
                // fixed kinds come from annotated bindings.
                match annotation_scalar_kind(term.annotation.as_ref())? {
                    Some(kind) => Object::int_typed(value, kind),
                    None => Ok(Object::int(value)),
                }
            }
            TermKind::Number => {
                let value: f64 = term
                    .text
                    .parse()
                    .map_err(|_| NlError::value(format!("bad number literal '{}'", term.text)))?;
                match annotation_scalar_kind(term.annotation.as_ref())? {
                    Some(kind) => Ok(Object::tensor(Tensor::scalar_f64(value, kind)?)),
                    None => Ok(Object::float(value)),
                }
            }
            TermKind::Fraction => Ok(Object::fraction(Fraction::parse(&term.text)?)),
            TermKind::StrChar => Ok(Object::str_bytes(&term.text)),
            TermKind::StrWide => Ok(Object::str_wide(&term.text)),
            _ => Err(NlError::runtime(format!(
                "not a literal term: {:?}",
                term.kind
            ))),
        }
    }

    // ==================== names ====================

    fn resolve_name(&mut self, term: &Term) -> EvalResult {
        let name = &term.text;
        let found = match term.kind {
            TermKind::Name => self.scopes.get_bare(name),
            TermKind::Local => match name.strip_prefix('.') {
                Some(bare) => self.scopes.get_session_direct(bare),
                None => self.scopes.get_local(name),
            },
            TermKind::Module => match name.strip_prefix('.') {
                Some(bare) => self.scopes.get_global_direct(bare),
                None => self.scopes.get_module(name),
            },
            TermKind::Native => self.scopes.get_module(name),
            _ => None,
        };
        found.ok_or_else(|| Unwind::Error(NlError::runtime(format!("name '{name}' is not defined"))))
    }

    fn eval_argument(&mut self, term: &Term) -> EvalResult {
        let index: usize = term
            .text
            .parse()
            .map_err(|_| NlError::value(format!("bad argument reference '${}'", term.text)))?;
        let ctx = self.call_stack.last().ok_or_else(|| {
            Unwind::Error(NlError::runtime(
                "argument references need an active call".to_string(),
            ))
        })?;
        if index == 0 {
            return Ok(ctx.callee.clone());
        }
        ctx.args
            .get(index - 1)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| {
                Unwind::Error(NlError::runtime(format!(
                    "argument ${index} is out of range ({} supplied)",
                    self.call_stack.last().map(|c| c.args.len()).unwrap_or(0)
                )))
            })
    }

    /// `$` — the names bound in the visible frame chain, as strings.
    fn context_listing(&self) -> Object {
        let mut dict = DictData::new();
        for name in self.scopes.visible_names() {
            dict.push(None, Object::str_bytes(&name));
        }
        Object::dict(dict)
    }

    fn eval_type_name(&mut self, term: &Term) -> EvalResult {
        let kind = NlType::from_name(&term.text);
        let dims = match &term.annotation {
            Some(annotation) => self.eval_dims(&annotation.dims)?,
            None => Vec::new(),
        };
        Ok(Object::type_value(TypeValue { kind, dims }))
    }

    pub(crate) fn eval_dims(&mut self, dims: &[Term]) -> Result<Vec<Dim>, Unwind> {
        let mut out = Vec::with_capacity(dims.len());
        for dim in dims {
            if dim.kind == TermKind::Ellipsis {
                out.push(Dim::Any);
                continue;
            }
            let value = self.eval_term(dim)?;
            let extent = value.as_i64().ok_or_else(|| {
                Unwind::Error(NlError::type_error(
                    "tensor dimensions must be integers".to_string(),
                ))
            })?;
            if extent < 0 {
                return Err(Unwind::Error(NlError::value(format!(
                    "negative tensor dimension {extent}"
                ))));
            }
            out.push(Dim::Fixed(extent as usize));
        }
        Ok(out)
    }

    // ==================== composite expressions ====================

    fn eval_backquote(&mut self, term: &Term) -> EvalResult {
        let expanded = self
            .macros
            .expand(&term.text, self.config.macro_expansion_limit)?;
        let parsed = newlang_parser::Parser::new(&expanded).parse_program()?;
        self.eval_term(&parsed)
    }

    fn eval_call(&mut self, term: &Term) -> EvalResult {
        let callee_term = term.left.as_ref().ok_or_else(|| {
            Unwind::Error(NlError::runtime("call without a callee".to_string()))
        })?;

        // Method-style calls through a field: string methods, and
        // dictionary members holding callables.
        if callee_term.kind == TermKind::Field {
            return self.eval_method_call(term, callee_term);
        }

        let callee = self.eval_term(callee_term)?;
        let args = self.eval_args(&term.args)?;
        self.dispatch_call(&callee, args, term)
    }

    fn eval_method_call(&mut self, call: &Term, field: &Term) -> EvalResult {
        let receiver_term = field.left.as_ref().expect("field has a receiver");
        let receiver = self.eval_term(receiver_term)?;

        if let Some(s) = receiver.as_str() {
            match field.text.as_str() {
                "upper" => return Ok(Object::string(s.to_upper())),
                "lower" => return Ok(Object::string(s.to_lower())),
                _ => {}
            }
        }

        let callee = receiver.field_get(&field.text)?;
        let args = self.eval_args(&call.args)?;
        self.dispatch_call(&callee, args, call)
    }

    pub(crate) fn eval_args(
        &mut self,
        args: &[(Option<String>, Term)],
    ) -> Result<Vec<(Option<String>, Object)>, Unwind> {
        let mut out = Vec::with_capacity(args.len());
        for (name, term) in args {
            out.push((name.clone(), self.eval_term(term)?));
        }
        Ok(out)
    }

    fn eval_type_call(&mut self, term: &Term) -> EvalResult {
        let annotation = term
            .annotation
            .clone()
            .unwrap_or_else(|| TypeAnnotation::simple(&term.text));
        let dims = self.eval_dims(&annotation.dims)?;
        let kind = NlType::from_name(&annotation.name);
        super::comprehension::construct(self, &kind, &dims, &term.args)
    }

    fn eval_index(&mut self, term: &Term) -> EvalResult {
        let base = term.left.as_ref().expect("index has a base");
        let target = self.eval_term(base)?;
        let indices = self.eval_index_args(&term.args)?;
        Ok(target.index_get(&indices)?)
    }

    fn eval_index_args(
        &mut self,
        args: &[(Option<String>, Term)],
    ) -> Result<Vec<Object>, Unwind> {
        let mut out = Vec::with_capacity(args.len());
        for (_, term) in args {
            out.push(self.eval_term(term)?);
        }
        Ok(out)
    }

    fn eval_field(&mut self, term: &Term) -> EvalResult {
        let base = term.left.as_ref().expect("field has a base");
        let target = self.eval_term(base)?;
        Ok(target.field_get(&term.text)?)
    }

    fn eval_unary(&mut self, term: &Term) -> EvalResult {
        let operand = self.eval_term(term.left.as_ref().expect("unary operand"))?;
        match term.text.as_str() {
            "-" => Ok(operand.negate()?),
            "+" => Ok(operand),
            other => Err(Unwind::Error(NlError::runtime(format!(
                "unknown unary operator '{other}'"
            )))),
        }
    }

    fn eval_operator(&mut self, term: &Term) -> EvalResult {
        let left_term = term.left.as_ref().expect("binary lhs");
        let right_term = term.right.as_ref().expect("binary rhs");

        // Short-circuit logic first.
        match term.text.as_str() {
            "&&" => {
                let left = self.eval_term(left_term)?;
                if !left.is_truthy() {
                    return Ok(Object::bool_value(false));
                }
                let right = self.eval_term(right_term)?;
                return Ok(Object::bool_value(right.is_truthy()));
            }
            "||" => {
                let left = self.eval_term(left_term)?;
                if left.is_truthy() {
                    return Ok(Object::bool_value(true));
                }
                let right = self.eval_term(right_term)?;
                return Ok(Object::bool_value(right.is_truthy()));
            }
            _ => {}
        }

        let left = self.eval_term(left_term)?;
        let right = self.eval_term(right_term)?;
        let out = match term.text.as_str() {
            "+" => left.arithmetic('+', &right)?,
            "-" => left.arithmetic('-', &right)?,
            "*" => left.arithmetic('*', &right)?,
            "/" => left.arithmetic('/', &right)?,
            "//" => left.arithmetic('f', &right)?,
            "%" => left.arithmetic('%', &right)?,
            "**" => left.arithmetic('p', &right)?,
            "|" => left.arithmetic('|', &right)?,
            "^" => left.arithmetic('^', &right)?,
            "&" => left.arithmetic('&', &right)?,
            "<<" => left.arithmetic('<', &right)?,
            ">>" => left.arithmetic('>', &right)?,
            "++" => left.concat(&right)?,
            "==" => Object::bool_value(left.equals(&right)),
            "!=" => Object::bool_value(!left.equals(&right)),
            "===" => Object::bool_value(left.strict_equals(&right)),
            "<" => Object::bool_value(left.compare_order(&right)? == std::cmp::Ordering::Less),
            "<=" => Object::bool_value(left.compare_order(&right)? != std::cmp::Ordering::Greater),
            ">" => Object::bool_value(left.compare_order(&right)? == std::cmp::Ordering::Greater),
            ">=" => Object::bool_value(left.compare_order(&right)? != std::cmp::Ordering::Less),
            "<=>" => {
                let ordering = left.compare_order(&right)?;
                Object::int(match ordering {
                    std::cmp::Ordering::Less => -1,
                    std::cmp::Ordering::Equal => 0,
                    std::cmp::Ordering::Greater => 1,
                })
            }
            "~" => Object::bool_value(predicate::check_instance(&left, &right)?),
            "~~" => Object::bool_value(predicate::check_structural(&left, &right)?),
            "~~~" => Object::bool_value(predicate::check_strict(&left, &right)?),
            "!~" => Object::bool_value(!predicate::check_instance(&left, &right)?),
            "!~~" => Object::bool_value(!predicate::check_structural(&left, &right)?),
            other => {
                return Err(Unwind::Error(NlError::runtime(format!(
                    "unknown operator '{other}'"
                ))));
            }
        };
        Ok(out)
    }

    fn eval_range(&mut self, term: &Term) -> EvalResult {
        let mut start = None;
        let mut stop = None;
        let mut step = None;
        for (name, value) in &term.args {
            let value = self.eval_term(value)?;
            match name.as_deref() {
                Some("start") => start = Some(value),
                Some("stop") => stop = Some(value),
                Some("step") => step = Some(value),
                _ => {}
            }
        }
        let (Some(start), Some(stop)) = (start, stop) else {
            return Err(Unwind::Error(NlError::runtime(
                "range needs start and stop".to_string(),
            )));
        };
        Ok(Object::range(RangeData::new(start, stop, step)?))
    }

    fn eval_dict_literal(&mut self, term: &Term) -> EvalResult {
        let mut dict = DictData::new();
        for (name, value) in &term.args {
            if value.kind == TermKind::Ellipsis {
                if let Some(expr) = &value.left {
                    // `... dict` splices the elements
                    let spliced = self.eval_term(expr)?;
                    if let Some(source) = spliced.as_dict_ref() {
                        dict.append_all(&source.borrow());
                        continue;
                    }
                }
            }
            let value = self.eval_term(value)?;
            dict.push(name.clone(), value);
        }
        Ok(Object::dict(dict))
    }

    fn eval_tensor_literal(&mut self, term: &Term) -> EvalResult {
        let mut rows: Vec<Tensor> = Vec::new();
        for (_, element) in &term.args {
            let value = self.eval_term(element)?;
            let tensor = match value.payload {
                Payload::Tensor(t) => t,
                Payload::Fraction(f) => {
                    Tensor::scalar_f64(f.to_f64(), ScalarKind::Float64).map_err(Unwind::Error)?
                }
                _ => {
                    return Err(Unwind::Error(NlError::type_error(format!(
                        "{} cannot be a tensor element",
                        value.kind().name()
                    ))));
                }
            };
            rows.push(tensor);
        }
        let tensor = build_tensor_from_rows(rows)?;

        let tensor = match annotation_scalar_kind(term.annotation.as_ref())? {
            Some(kind) => tensor.to_kind(kind)?,
            None => tensor,
        };
        Ok(Object::tensor(tensor))
    }

    // ==================== blocks and control ====================

    fn eval_block(&mut self, term: &Term) -> EvalResult {
        match term.kind {
            TermKind::Block => {
                let mut last = Object::none();
                for statement in &term.block {
                    self.check_interrupt()?;
                    last = self.eval_term(statement)?;
                }
                Ok(last)
            }
            TermKind::BlockTry => {
                let mut last = Object::none();
                for statement in &term.block {
                    self.check_interrupt()?;
                    match self.eval_term(statement) {
                        Ok(value) => last = value,
                        // Control-flow carriers pass through untouched.
                        Err(Unwind::Error(error)) => {
                            return Ok(Object::error_value(error.to_string()));
                        }
                        Err(other) => return Err(other),
                    }
                }
                Ok(last)
            }
            TermKind::BlockAnd => {
                for statement in &term.block {
                    self.check_interrupt()?;
                    if !self.eval_term(statement)?.is_truthy() {
                        return Ok(Object::bool_value(false));
                    }
                }
                Ok(Object::bool_value(true))
            }
            TermKind::BlockOr => {
                for statement in &term.block {
                    self.check_interrupt()?;
                    if self.eval_term(statement)?.is_truthy() {
                        return Ok(Object::bool_value(true));
                    }
                }
                Ok(Object::bool_value(false))
            }
            TermKind::BlockXor => {
                let mut truthy = 0usize;
                for statement in &term.block {
                    self.check_interrupt()?;
                    if self.eval_term(statement)?.is_truthy() {
                        truthy += 1;
                    }
                }
                Ok(Object::bool_value(truthy % 2 == 1))
            }
            _ => unreachable!("eval_block takes block terms"),
        }
    }

    fn eval_follow(&mut self, term: &Term) -> EvalResult {
        for (_, arm) in &term.args {
            let guard = arm.left.as_ref().expect("follow arm guard");
            let matches = if guard.kind == TermKind::None {
                true
            } else {
                self.eval_term(guard)?.is_truthy()
            };
            if matches {
                let body = arm.right.as_ref().expect("follow arm body");
                return self.eval_term(body);
            }
        }
        Ok(Object::none())
    }

    fn eval_repeat(&mut self, term: &Term) -> EvalResult {
        let guard = term.left.as_ref().expect("repeat guard");
        let body = term.right.as_ref().expect("repeat body");
        let mut last = Object::none();

        loop {
            self.check_interrupt()?;
            if !self.eval_term(guard)?.is_truthy() {
                break;
            }
            match self.eval_term(body) {
                Ok(value) => last = value,
                Err(Unwind::Break(value)) => return Ok(value),
                Err(other) => return Err(other),
            }
        }
        Ok(last)
    }

    // ==================== iterators ====================

    fn eval_iterator_op(&mut self, term: &Term) -> EvalResult {
        let source = self.eval_term(term.left.as_ref().expect("iterator source"))?;
        let args = self.eval_args(&term.args)?;
        let (filter, count) = split_iter_args(&args)?;

        match term.text.as_str() {
            "?" => Ok(self.make_iterator(&source, filter.as_deref())?),
            "??" => {
                let iter = source.as_iter().ok_or_else(|| {
                    Unwind::Error(NlError::type_error("'??' resets an iterator".to_string()))
                })?;
                iter.borrow_mut().reset();
                Ok(source)
            }
            "!" => {
                let iter = source.as_iter().ok_or_else(|| {
                    Unwind::Error(NlError::type_error("'!' advances an iterator".to_string()))
                })?;
                match count {
                    Some(count) => Ok(Object::dict(iter.borrow_mut().take(count))),
                    None => Ok(match iter.borrow_mut().next() {
                        IterStep::Item(value) => value,
                        IterStep::End => Object::iterator_end(),
                    }),
                }
            }
            "!?" | "?!" => {
                if let Some(iter) = source.as_iter() {
                    return Ok(match count {
                        Some(count) => Object::dict(iter.borrow_mut().take(count)),
                        None => Object::dict(iter.borrow_mut().take_rest()),
                    });
                }
                // Materialize straight from a container source.
                let iterator = self.make_iterator(&source, filter.as_deref())?;
                let iter = iterator.as_iter().expect("just built");
                let out = match count {
                    Some(count) => iter.borrow_mut().take(count),
                    None => iter.borrow_mut().take_rest(),
                };
                Ok(Object::dict(out))
            }
            other => Err(Unwind::Error(NlError::runtime(format!(
                "unknown iterator operator '{other}'"
            )))),
        }
    }

    fn make_iterator(&mut self, source: &Object, filter: Option<&str>) -> Result<Object, NlError> {
        if let Some(dict) = source.as_dict_ref() {
            return Ok(Object::iterator(IterData::new(&dict, filter)?));
        }
        if let Some(range) = source.as_range() {
            let mut dict = DictData::new();
            for value in range.enumerate()? {
                dict.push(None, value);
            }
            return Ok(Object::iterator(IterData::owned(
                crate::object::new_dict_ref(dict),
                filter,
            )?));
        }
        if let Some(s) = source.as_str() {
            let mut dict = DictData::new();
            for i in 0..s.len() {
                dict.push(None, Object::string(s.get(i as i64)?));
            }
            return Ok(Object::iterator(IterData::owned(
                crate::object::new_dict_ref(dict),
                filter,
            )?));
        }
        Err(NlError::type_error(format!(
            "{} is not iterable",
            source.kind().name()
        )))
    }

    // ==================== macro definitions ====================

    fn register_macro_def(&mut self, term: &Term) -> Result<(), NlError> {
        let text = &term.text;
        let inner = text
            .strip_prefix("\\\\")
            .and_then(|t| t.strip_suffix("\\\\\\"))
            .ok_or_else(|| NlError::runtime("malformed macro definition".to_string()))?;
        let mut buffer = format!("\\\\{inner}\\\\\\");
        self.macros.extract(&mut buffer)?;
        Ok(())
    }

    // ==================== assignment ====================

    fn eval_assign(&mut self, term: &Term) -> EvalResult {
        let kind = term.assign_kind.expect("assign term has a mode");
        let lhs = term.left.as_ref().expect("assign lhs");
        let rhs = term.right.as_ref().expect("assign rhs");

        if let AssignKind::Compound(op) = kind {
            return self.eval_compound_assign(op, lhs, rhs);
        }

        let pure = matches!(
            kind,
            AssignKind::PureCreateOrAssign | AssignKind::PureCreateOnly
        );

        match lhs.kind {
            TermKind::Call => self.assign_function(kind, pure, lhs, rhs),
            TermKind::TypeName => self.define_class(kind, lhs, rhs),
            TermKind::Index | TermKind::Field => {
                let value = self.eval_term(rhs)?;
                self.assign_through_path(lhs, &value)?;
                Ok(value)
            }
            TermKind::Name | TermKind::Local | TermKind::Module | TermKind::Native => {
                // `name := _` removes the binding.
                if rhs.kind == TermKind::None && kind == AssignKind::CreateOrAssign {
                    let removed = self.scopes.remove(&bare_name(lhs));
                    return Ok(Object::bool_value(removed));
                }
                let value = self.eval_term(rhs)?;
                self.bind_name(kind, lhs, value)
            }
            _ => Err(Unwind::Error(NlError::runtime(
                "left side of assignment is not assignable".to_string(),
            ))),
        }
    }

    fn eval_compound_assign(&mut self, op: char, lhs: &Term, rhs: &Term) -> EvalResult {
        let current = self.eval_term(lhs)?;
        let delta = self.eval_term(rhs)?;
        let value = current.arithmetic(op, &delta)?;

        match lhs.kind {
            TermKind::Index | TermKind::Field => {
                self.assign_through_path(lhs, &value)?;
            }
            _ => {
                self.bind_name(AssignKind::AssignOnly, lhs, value.clone())?;
            }
        }
        Ok(value)
    }

    /// Store a value into a name-like target, honoring the assignment
    /// mode, the sigil tier, and any fixed kind.
    fn bind_name(&mut self, kind: AssignKind, lhs: &Term, value: Object) -> EvalResult {
        let name = bare_name(lhs);
        let direct = lhs.text.starts_with('.');

        // Coerce toward an annotation or an existing fixed kind.
        let mut value = match &lhs.annotation {
            Some(annotation) => {
                let target = NlType::from_name(&annotation.name);
                value.coerce_to(&target)?
            }
            None => value,
        };
        let existing_tier = if direct {
            match lhs.kind {
                TermKind::Local => self
                    .scopes
                    .get_session_direct(&name)
                    .map(|_| FrameKind::Session),
                _ => self
                    .scopes
                    .get_global_direct(&name)
                    .map(|_| FrameKind::Global),
            }
        } else {
            self.scopes.find(&name)
        };

        if let Some(tier) = existing_tier {
            let current = match tier {
                FrameKind::Local => self.scopes.get_bare(&name),
                FrameKind::Session => self.scopes.get_session_direct(&name),
                FrameKind::Global => self.scopes.get_global_direct(&name),
            };

            // Pointer-backed tensors keep their binding: writes go
            // through the foreign memory instead of replacing it.
            if let Some(mut current) = current.clone() {
                let foreign = current
                    .as_tensor()
                    .map(Tensor::is_foreign)
                    .unwrap_or(false);
                if foreign && !matches!(kind, AssignKind::CreateOnly | AssignKind::PureCreateOnly)
                {
                    let scalar = value
                        .as_tensor()
                        .and_then(Tensor::scalar_value)
                        .ok_or_else(|| {
                            Unwind::Error(NlError::type_error(
                                "pointer-backed values take numeric scalars".to_string(),
                            ))
                        })?;
                    let tensor = current.as_tensor_mut().expect("checked foreign");
                    for i in 0..tensor.len() {
                        tensor.set(i, scalar)?;
                    }
                    return Ok(current);
                }
            }

            if let Some(fixed) = current.and_then(|c| c.fixed) {
                if lhs.annotation.is_none() {
                    value = value.coerce_to(&fixed)?;
                }
            }
        }

        match kind {
            AssignKind::CreateOnly | AssignKind::PureCreateOnly => {
                if existing_tier.is_some() {
                    return Err(Unwind::Error(NlError::runtime(format!(
                        "name '{name}' already exists"
                    ))));
                }
                self.scopes.create(self.creation_tier(lhs), &name, value.clone())?;
            }
            AssignKind::AssignOnly => {
                let tier = existing_tier.ok_or_else(|| {
                    Unwind::Error(NlError::runtime(format!("name '{name}' is not defined")))
                })?;
                self.scopes.assign(tier, &name, value.clone())?;
            }
            AssignKind::CreateOrAssign | AssignKind::PureCreateOrAssign => match existing_tier {
                Some(tier) => self.scopes.assign(tier, &name, value.clone())?,
                None => self
                    .scopes
                    .create(self.creation_tier(lhs), &name, value.clone())?,
            },
            AssignKind::Compound(_) => unreachable!("handled by eval_compound_assign"),
        }
        Ok(value)
    }

    /// Which tier a fresh binding of this target lands in.
    fn creation_tier(&self, lhs: &Term) -> FrameKind {
        match lhs.kind {
            TermKind::Local => FrameKind::Session,
            TermKind::Module => FrameKind::Global,
            _ => FrameKind::Local,
        }
    }

    /// Mutate through `a[i].b[j] = value` paths. Dictionaries share
    /// storage, so intermediate steps borrow into them; the outermost
    /// binding is written back to cover value payloads.
    fn assign_through_path(&mut self, lhs: &Term, value: &Object) -> Result<(), Unwind> {
        // Collect the path root and segments.
        let mut segments: Vec<PathSeg> = Vec::new();
        let mut cursor = lhs;
        loop {
            match cursor.kind {
                TermKind::Index => {
                    let indices = self.eval_index_args(&cursor.args)?;
                    segments.push(PathSeg::Index(indices));
                    cursor = cursor.left.as_ref().expect("index base");
                }
                TermKind::Field => {
                    segments.push(PathSeg::Field(cursor.text.clone()));
                    cursor = cursor.left.as_ref().expect("field base");
                }
                _ => break,
            }
        }
        segments.reverse();

        let mut root = self.eval_term(cursor)?;
        apply_path(&mut root, &segments, value)?;

        // Write the root back when it is a frame binding; shared dict
        // storage makes this a no-op for reference payloads.
        if cursor.is_named() {
            self.bind_name(AssignKind::AssignOnly, cursor, root)?;
        }
        Ok(())
    }

    // ==================== functions and classes ====================

    fn assign_function(
        &mut self,
        kind: AssignKind,
        pure: bool,
        proto: &Term,
        body: &Term,
    ) -> EvalResult {
        let name_term = proto.left.as_ref().expect("call has a callee term");

        // `@f(...) ::= :Pointer('...')` binds the produced callable;
        // any other right side becomes the function body, blocks and
        // single expressions alike, and is not evaluated here.
        let value = if body.kind == TermKind::TypeCall {
            let evaluated = self.eval_term(body)?;
            match &evaluated.payload {
                Payload::NativeFunc(_) | Payload::EvalFunc(_) => evaluated,
                _ => {
                    return Err(Unwind::Error(NlError::type_error(
                        "a prototyped binding needs a callable right side".to_string(),
                    )));
                }
            }
        } else {
            Object::eval_func(crate::object::EvalFunc {
                name: bare_name(name_term),
                proto: proto.clone(),
                body: body.clone(),
                pure_func: pure,
            })
        };

        self.bind_name(plain_assign_kind(kind), name_term, value)
    }

    fn define_class(&mut self, kind: AssignKind, lhs: &Term, rhs: &Term) -> EvalResult {
        let class_name = lhs.text.clone();
        if !matches!(
            kind,
            AssignKind::CreateOrAssign | AssignKind::CreateOnly
        ) {
            return Err(Unwind::Error(NlError::runtime(
                "classes are defined with ':=' or '::='".to_string(),
            )));
        }
        if kind == AssignKind::CreateOnly && self.classes.contains_key(&class_name) {
            return Err(Unwind::Error(NlError::runtime(format!(
                "class '{class_name}' already exists"
            ))));
        }

        let (parents, prototype) = match rhs.kind {
            // `:Name := :Class(field=..., )` or `:Name := :Base(overrides...)`
            TermKind::TypeCall => {
                let base = rhs.text.clone();
                let fields = self.eval_args(&rhs.args)?;
                if base == "Class" {
                    (Vec::new(), fields_to_dict(fields))
                } else {
                    let parent = self.classes.get(&base).cloned().ok_or_else(|| {
                        Unwind::Error(NlError::runtime(format!(
                            "base class '{base}' is not defined"
                        )))
                    })?;
                    let mut prototype = parent.prototype.clone();
                    for (name, value) in fields {
                        match name {
                            Some(name) => prototype.set_by_name(&name, value),
                            None => prototype.push(None, value),
                        }
                    }
                    (vec![base], prototype)
                }
            }
            TermKind::Dict => {
                let fields = self.eval_args(&rhs.args)?;
                (Vec::new(), fields_to_dict(fields))
            }
            _ => {
                return Err(Unwind::Error(NlError::runtime(
                    "a class body is a dictionary or a base-class constructor".to_string(),
                )));
            }
        };

        // Flatten ancestry; parents are registered already, so the
        // chain cannot cycle.
        let mut ancestry = Vec::new();
        for parent in &parents {
            ancestry.push(parent.clone());
            if let Some(def) = self.classes.get(parent) {
                ancestry.extend(def.ancestry.iter().cloned());
            }
        }

        self.classes.insert(
            class_name.clone(),
            super::ClassDef {
                name: class_name.clone(),
                parents,
                ancestry,
                prototype,
            },
        );
        Ok(Object::type_value(TypeValue::simple(NlType::Class(
            class_name,
        ))))
    }
}

/// One step of an assignment path.
enum PathSeg {
    Index(Vec<Object>),
    Field(String),
}

/// Recursive in-place write along a path.
fn apply_path(target: &mut Object, path: &[PathSeg], value: &Object) -> Result<(), NlError> {
    let Some((head, rest)) = path.split_first() else {
        *target = value.clone();
        return Ok(());
    };

    if rest.is_empty() {
        return match head {
            PathSeg::Index(indices) => target.index_set(indices, value),
            PathSeg::Field(name) => target.field_set(name, value.clone()),
        };
    }

    // Walk one level into a dictionary-backed container.
    let dict = target.as_dict_ref().ok_or_else(|| {
        NlError::type_error(format!(
            "cannot assign through {}",
            target.kind().name()
        ))
    })?;
    let mut dict = dict.borrow_mut();
    let element = match head {
        PathSeg::Index(indices) => match indices.as_slice() {
            [index] => match &index.payload {
                Payload::Str(name) => dict.item_mut_by_name(&name.to_text())?,
                _ => dict.item_mut(index.as_i64().ok_or_else(|| {
                    NlError::type_error("dictionary indices are integers or names".to_string())
                })?)?,
            },
            _ => {
                return Err(NlError::runtime(
                    "dictionaries take exactly one index".to_string(),
                ));
            }
        },
        PathSeg::Field(name) => dict.item_mut_by_name(name)?,
    };
    apply_path(element, rest, value)
}

/// Stack rank-equal tensors into one of rank+1 (or return the scalar
/// elements as a vector).
fn build_tensor_from_rows(rows: Vec<Tensor>) -> Result<Tensor, Unwind> {
    if rows.is_empty() {
        return Ok(Tensor::from_elements(ScalarKind::Bool, vec![0], vec![]).map_err(Unwind::Error)?);
    }

    let first_shape = rows[0].shape().to_vec();
    let mut kind = ScalarKind::Bool;
    let mut elements: Vec<Scalar> = Vec::new();
    for row in &rows {
        if row.shape() != first_shape.as_slice() {
            return Err(Unwind::Error(NlError::value(
                "tensor rows have mismatched shapes".to_string(),
            )));
        }
        kind = kind.max(row.kind());
        elements.extend(row.elements());
    }
    // Integer elements take the narrowest kind that fits them all.
    if kind.is_integer() {
        kind = elements.iter().fold(ScalarKind::Bool, |k, s| match s {
            Scalar::Int(v) => k.max(ScalarKind::narrowest_int(*v)),
            Scalar::Float(_) => k.max(ScalarKind::Float64),
        });
    }

    let mut shape = vec![rows.len()];
    shape.extend_from_slice(&first_shape);
    Tensor::from_elements(kind, shape, elements).map_err(Unwind::Error)
}

fn fields_to_dict(fields: Vec<(Option<String>, Object)>) -> DictData {
    let mut dict = DictData::new();
    for (name, value) in fields {
        dict.push(name, value);
    }
    dict
}

/// Strip the `$.`/`@.` marker for storage under the bare name.
fn bare_name(term: &Term) -> String {
    term.text.trim_start_matches('.').to_string()
}

/// Pure markers carry over to how the binding is created.
fn plain_assign_kind(kind: AssignKind) -> AssignKind {
    match kind {
        AssignKind::PureCreateOrAssign => AssignKind::CreateOrAssign,
        AssignKind::PureCreateOnly => AssignKind::CreateOnly,
        other => other,
    }
}

/// Scalar kind named by an annotation, if it names one.
fn annotation_scalar_kind(
    annotation: Option<&TypeAnnotation>,
) -> Result<Option<ScalarKind>, NlError> {
    let Some(annotation) = annotation else {
        return Ok(None);
    };
    match ScalarKind::from_name(&annotation.name) {
        Some(kind) => Ok(Some(kind)),
        None => match annotation.name.as_str() {
            // Abstract numeric annotations keep the inferred kind.
            "Tensor" | "Arithmetic" | "Any" | "Number" => Ok(None),
            other => Err(NlError::type_error(format!(
                "'{other}' is not a scalar type"
            ))),
        },
    }
}

/// Iterator-op arguments: strings filter, integers count.
fn split_iter_args(
    args: &[(Option<String>, Object)],
) -> Result<(Option<String>, Option<i64>), Unwind> {
    let mut filter = None;
    let mut count = None;
    for (_, value) in args {
        if let Some(s) = value.as_str() {
            filter = Some(s.to_text());
        } else if let Some(n) = value.as_i64() {
            count = Some(n);
        } else {
            return Err(Unwind::Error(NlError::type_error(format!(
                "iterator arguments are names or counts, got {}",
                value.kind().name()
            ))));
        }
    }
    Ok((filter, count))
}
