//! End-to-end pipeline tests: tree → scopes → types → costs → budget.
//!
//! Trees are built programmatically (the parser is an external collaborator),
//! run through [`analyze`], and checked against the side tables or the
//! reported error set.

use tally_sema::{analyze, Analysis, Architecture, Prelude};
use tally_types::ast::{
    AssignStmt, Block, Def, Expr, ExprKind, FieldDecl, FileNode, FormalParamDecl, FunctionDef,
    Ident, LetStmt, NodeIdGen, ObjectDef, RecordDef, ReturnStmt, SignifierKind, Stmt, SumDef,
    SumMember, TypeParamDecl, TypeSignifier,
};
use tally_types::{ErrorCode, ErrorSet, Span};

// ══════════════════════════════════════════════════════════════════════════════
// Tree building
// ══════════════════════════════════════════════════════════════════════════════

/// Builds well-formed trees with unique node ids and one source line per
/// node, so error contexts never collide under deduplication.
struct Tree {
    ids: NodeIdGen,
    line: u32,
}

impl Tree {
    fn new() -> Self {
        Self {
            ids: NodeIdGen::new(),
            line: 0,
        }
    }

    fn span(&mut self) -> Span {
        self.line += 1;
        Span::point(self.line, 1)
    }

    fn ident(&mut self, name: &str) -> Ident {
        let span = self.span();
        Ident::new(name, span)
    }

    // ── Type signifiers ──

    fn sig(&mut self, kind: SignifierKind) -> TypeSignifier {
        let id = self.ids.next();
        let span = self.span();
        TypeSignifier { id, kind, span }
    }

    fn ground(&mut self, name: &str) -> TypeSignifier {
        self.sig(SignifierKind::Ground(name.into()))
    }

    fn parameterized(&mut self, name: &str, args: Vec<TypeSignifier>) -> TypeSignifier {
        self.sig(SignifierKind::Parameterized {
            name: name.into(),
            args,
        })
    }

    fn bound(&mut self, n: u64) -> TypeSignifier {
        self.sig(SignifierKind::NumericLiteral(n))
    }

    // ── Expressions ──

    fn expr(&mut self, kind: ExprKind) -> Expr {
        let id = self.ids.next();
        let span = self.span();
        Expr { id, kind, span }
    }

    fn int(&mut self, v: i64) -> Expr {
        self.expr(ExprKind::IntLit(v))
    }

    fn string(&mut self, s: &str) -> Expr {
        self.expr(ExprKind::StringLit(s.into()))
    }

    fn decimal(&mut self, s: &str) -> Expr {
        self.expr(ExprKind::DecimalLit(s.into()))
    }

    fn name(&mut self, n: &str) -> Expr {
        self.expr(ExprKind::Identifier(n.into()))
    }

    fn list(&mut self, items: Vec<Expr>) -> Expr {
        self.expr(ExprKind::ListLit(items))
    }

    fn set(&mut self, items: Vec<Expr>) -> Expr {
        self.expr(ExprKind::SetLit(items))
    }

    fn member(&mut self, object: Expr, member: &str) -> Expr {
        let member = self.ident(member);
        self.expr(ExprKind::MemberAccess {
            object: Box::new(object),
            member,
        })
    }

    fn call(&mut self, callee: &str, type_args: Vec<TypeSignifier>, args: Vec<Expr>) -> Expr {
        let callee = self.ident(callee);
        self.expr(ExprKind::Call {
            callee,
            type_args,
            args,
        })
    }

    fn method(&mut self, object: Expr, method: &str, args: Vec<Expr>) -> Expr {
        let method = self.ident(method);
        self.expr(ExprKind::MethodCall {
            object: Box::new(object),
            method,
            args,
        })
    }

    fn if_else(&mut self, condition: Expr, then_block: Block, else_block: Option<Block>) -> Expr {
        self.expr(ExprKind::If {
            condition: Box::new(condition),
            then_block,
            else_block,
        })
    }

    fn foreach(&mut self, item: &str, iterable: Expr, body: Block) -> Expr {
        let item = self.ident(item);
        self.expr(ExprKind::Foreach {
            item,
            iterable: Box::new(iterable),
            body,
        })
    }

    // ── Statements & blocks ──

    fn block(&mut self, lines: Vec<Stmt>) -> Block {
        let id = self.ids.next();
        let span = self.span();
        Block { id, lines, span }
    }

    fn let_binding(
        &mut self,
        name: &str,
        mutable: bool,
        sig: Option<TypeSignifier>,
        value: Expr,
    ) -> Stmt {
        let name = self.ident(name);
        let id = self.ids.next();
        let span = self.span();
        Stmt::Let(LetStmt {
            id,
            name,
            mutable,
            sig,
            value,
            span,
        })
    }

    fn let_(&mut self, name: &str, value: Expr) -> Stmt {
        self.let_binding(name, false, None, value)
    }

    fn let_typed(&mut self, name: &str, sig: TypeSignifier, value: Expr) -> Stmt {
        self.let_binding(name, false, Some(sig), value)
    }

    fn let_mut(&mut self, name: &str, value: Expr) -> Stmt {
        self.let_binding(name, true, None, value)
    }

    fn assign(&mut self, path: &[&str], value: Expr) -> Stmt {
        let target = path.iter().map(|p| self.ident(p)).collect();
        let id = self.ids.next();
        let span = self.span();
        Stmt::Assign(AssignStmt {
            id,
            target,
            value,
            span,
        })
    }

    fn ret(&mut self, value: Expr) -> Stmt {
        let id = self.ids.next();
        let span = self.span();
        Stmt::Return(ReturnStmt { id, value, span })
    }

    // ── Definitions ──

    fn type_param(&mut self, name: &str, fin: bool) -> TypeParamDecl {
        let name = self.ident(name);
        let id = self.ids.next();
        let span = self.span();
        TypeParamDecl {
            id,
            name,
            fin,
            span,
        }
    }

    fn param(&mut self, name: &str, sig: TypeSignifier) -> FormalParamDecl {
        let name = self.ident(name);
        let id = self.ids.next();
        let span = self.span();
        FormalParamDecl {
            id,
            name,
            sig,
            span,
        }
    }

    fn field(&mut self, name: &str, sig: TypeSignifier, mutable: bool) -> FieldDecl {
        let name = self.ident(name);
        let id = self.ids.next();
        let span = self.span();
        FieldDecl {
            id,
            name,
            sig,
            mutable,
            span,
        }
    }

    fn function(
        &mut self,
        name: &str,
        type_params: Vec<TypeParamDecl>,
        params: Vec<FormalParamDecl>,
        return_sig: TypeSignifier,
        body: Block,
    ) -> Def {
        let name = self.ident(name);
        let id = self.ids.next();
        let span = self.span();
        Def::Function(FunctionDef {
            id,
            name,
            type_params,
            params,
            return_sig,
            body,
            span,
        })
    }

    fn record(
        &mut self,
        name: &str,
        type_params: Vec<TypeParamDecl>,
        fields: Vec<FieldDecl>,
    ) -> RecordDef {
        let name = self.ident(name);
        let id = self.ids.next();
        let span = self.span();
        RecordDef {
            id,
            name,
            type_params,
            fields,
            span,
        }
    }

    fn object(&mut self, name: &str, fields: Vec<FieldDecl>) -> ObjectDef {
        let name = self.ident(name);
        let id = self.ids.next();
        let span = self.span();
        ObjectDef {
            id,
            name,
            fields,
            span,
        }
    }

    fn sum(&mut self, name: &str, members: Vec<SumMember>) -> Def {
        let name = self.ident(name);
        let id = self.ids.next();
        let span = self.span();
        Def::Sum(SumDef {
            id,
            name,
            type_params: vec![],
            members,
            span,
        })
    }

    fn file(&mut self, defs: Vec<Def>) -> FileNode {
        let id = self.ids.next();
        let span = self.span();
        FileNode {
            id,
            name: Some("test.tly".into()),
            defs,
            span,
        }
    }
}

fn run(file: &FileNode, arch: &Architecture) -> Result<Analysis, ErrorSet> {
    analyze(file, &Prelude::new(), arch)
}

fn run_default(file: &FileNode) -> Result<Analysis, ErrorSet> {
    run(file, &Architecture::default())
}

/// The single reportable error of a failed analysis.
fn single_error(errs: &ErrorSet) -> (ErrorCode, String) {
    let report = errs.report();
    assert_eq!(report.len(), 1, "expected exactly one error, got {report:#?}");
    (report[0].code, report[0].message.clone())
}

// ══════════════════════════════════════════════════════════════════════════════
// Cost bounds and the budget
// ══════════════════════════════════════════════════════════════════════════════

/// `fn main(): Nothing { let x = 1 }` — block, let and literal each charge
/// the flat per-node cost.
fn flat_cost_file(t: &mut Tree) -> FileNode {
    let one = t.int(1);
    let line = t.let_("x", one);
    let body = t.block(vec![line]);
    let ret = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], ret, body);
    t.file(vec![main])
}

#[test]
fn test_flat_node_cost_bounds_the_entry_function() {
    let mut t = Tree::new();
    let file = flat_cost_file(&mut t);
    let main_id = file.defs[0].id();
    let analysis = run(&file, &Architecture::new(1, 1000)).unwrap();
    assert_eq!(analysis.root_bound, Some(3));
    assert_eq!(analysis.tables.function_bounds.get(&main_id), Some(&3));
}

#[test]
fn test_overlay_changes_the_per_node_charge() {
    let mut t = Tree::new();
    let file = flat_cost_file(&mut t);
    let arch = Architecture::new(1, 1000).with_overlay("let", 5);
    let analysis = run(&file, &arch).unwrap();
    assert_eq!(analysis.root_bound, Some(7));
}

#[test]
fn test_zero_overlay_charge_is_rejected_not_applied() {
    // A free node kind would deflate every bound; the configuration is
    // refused before any bound is evaluated.
    let mut t = Tree::new();
    let file = flat_cost_file(&mut t);
    let arch = Architecture::new(1, 1000).with_overlay("let", 0);
    let errs = run(&file, &arch).unwrap_err();
    let (code, message) = single_error(&errs);
    assert_eq!(code, ErrorCode::COST_NOT_POSITIVE);
    assert!(message.contains("let"));
}

#[test]
fn test_over_budget_script_is_rejected() {
    let mut t = Tree::new();
    let file = flat_cost_file(&mut t);
    let errs = run(&file, &Architecture::new(1, 2)).unwrap_err();
    let (code, message) = single_error(&errs);
    assert_eq!(code, ErrorCode::COST_OVER_LIMIT);
    assert!(message.contains("exceeds"), "message: {message}");
    assert!(errs.to_json().contains("\"category\": \"cost\""));
}

#[test]
fn test_foreach_cost_multiplies_bound_by_body() {
    // let xs: List<I64, 10> = [1]; for x in xs { let y = x }
    let mut t = Tree::new();
    let one = t.int(1);
    let lit = t.list(vec![one]);
    let i64_sig = t.ground("I64");
    let ten = t.bound(10);
    let list_sig = t.parameterized("List", vec![i64_sig, ten]);
    let bind = t.let_typed("xs", list_sig, lit);

    let x = t.name("x");
    let inner = t.let_("y", x);
    let loop_body = t.block(vec![inner]);
    let xs = t.name("xs");
    let each = t.foreach("x", xs, loop_body);

    let body = t.block(vec![bind, Stmt::Expr(each)]);
    let ret = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], ret, body);
    let file = t.file(vec![main]);

    // block(1) + let(1 + 2) + foreach(1 + 1 + 10 × body(3)) = 36
    let analysis = run(&file, &Architecture::new(1, 1000)).unwrap();
    assert_eq!(analysis.root_bound, Some(36));
}

#[test]
fn test_hash_cost_closes_through_a_concrete_element_type() {
    // let s = {1}; let b = s.contains(1)
    let mut t = Tree::new();
    let one = t.int(1);
    let lit = t.set(vec![one]);
    let bind = t.let_("s", lit);
    let s = t.name("s");
    let arg = t.int(1);
    let contains = t.method(s, "contains", vec![arg]);
    let check = t.let_("b", contains);
    let body = t.block(vec![bind, check]);
    let ret = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], ret, body);
    let file = t.file(vec![main]);

    // block(1) + let s(3) + let b(1 + call(own 1 + recv 1 + hash 1 + arg 1))
    let analysis = run(&file, &Architecture::new(1, 1000)).unwrap();
    assert_eq!(analysis.root_bound, Some(9));
}

#[test]
fn test_symbolic_precision_cost_closes_at_the_call_site() {
    // fn scale<P fin>(d: Decimal<P>): Decimal<P> { return d.plus(d) }
    // fn main(): Nothing { let z = scale(1.25) }
    let mut t = Tree::new();
    let p = t.type_param("P", true);
    let p_arg = t.ground("P");
    let d_sig = t.parameterized("Decimal", vec![p_arg]);
    let d = t.param("d", d_sig);
    let recv = t.name("d");
    let other = t.name("d");
    let plus = t.method(recv, "plus", vec![other]);
    let ret_stmt = t.ret(plus);
    let scale_body = t.block(vec![ret_stmt]);
    let p_ret = t.ground("P");
    let ret_sig = t.parameterized("Decimal", vec![p_ret]);
    let scale = t.function("scale", vec![p], vec![d], ret_sig, scale_body);
    let scale_id = scale.id();

    let lit = t.decimal("1.25");
    let call = t.call("scale", vec![], vec![lit]);
    let bind = t.let_("z", call);
    let main_body = t.block(vec![bind]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![scale, main]);

    let analysis = run(&file, &Architecture::new(1, 1000)).unwrap();
    // The generic function keeps a symbolic cost and gets no evaluated bound.
    let scale_cost = analysis.tables.function_cost(scale_id).unwrap();
    assert!(!scale_cost.can_eval());
    assert!(!analysis.tables.function_bounds.contains_key(&scale_id));
    // "1.25" has three digits, so P := 3 closes the call. The replayed body
    // is block(1) + return(1) + method-call(1 + receiver 1 + plus(P=3) + arg 1) = 8:
    // block(1) + let(1 + call(1 + replayed body 8 + arg 1)) = 12
    assert_eq!(analysis.root_bound, Some(12));
}

#[test]
fn test_functions_are_ordered_callees_first() {
    // a calls b calls c.
    let mut t = Tree::new();
    let nothing = t.ground("Nothing");
    let c_body = t.block(vec![]);
    let c = t.function("c", vec![], vec![], nothing, c_body);
    let c_id = c.id();

    let call_c = t.call("c", vec![], vec![]);
    let b_body = t.block(vec![Stmt::Expr(call_c)]);
    let nothing = t.ground("Nothing");
    let b = t.function("b", vec![], vec![], nothing, b_body);
    let b_id = b.id();

    let call_b = t.call("b", vec![], vec![]);
    let a_body = t.block(vec![Stmt::Expr(call_b)]);
    let nothing = t.ground("Nothing");
    let a = t.function("a", vec![], vec![], nothing, a_body);
    let a_id = a.id();

    let file = t.file(vec![a, b, c]);
    let analysis = run_default(&file).unwrap();
    assert_eq!(analysis.root_bound, None);

    let order = &analysis.tables.function_order;
    let index = |id| order.iter().position(|&x| x == id).unwrap();
    assert!(index(c_id) < index(b_id));
    assert!(index(b_id) < index(a_id));
}

#[test]
fn test_recursion_is_rejected_with_every_participant() {
    let mut t = Tree::new();
    let call_pong = t.call("pong", vec![], vec![]);
    let ping_body = t.block(vec![Stmt::Expr(call_pong)]);
    let nothing = t.ground("Nothing");
    let ping = t.function("ping", vec![], vec![], nothing, ping_body);

    let call_ping = t.call("ping", vec![], vec![]);
    let pong_body = t.block(vec![Stmt::Expr(call_ping)]);
    let nothing = t.ground("Nothing");
    let pong = t.function("pong", vec![], vec![], nothing, pong_body);

    let file = t.file(vec![ping, pong]);
    let errs = run_default(&file).unwrap_err();
    let (code, message) = single_error(&errs);
    assert_eq!(code, ErrorCode::RECURSION_NOT_ALLOWED);
    assert!(message.contains("ping, pong"), "message: {message}");
}

// ══════════════════════════════════════════════════════════════════════════════
// Generics and substitution
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_inferred_type_argument_replays_into_the_return_type() {
    // fn id<T>(x: T): T { return x }; let y: I64 = id(1)
    let mut t = Tree::new();
    let tp = t.type_param("T", false);
    let x_sig = t.ground("T");
    let x = t.param("x", x_sig);
    let x_ref = t.name("x");
    let ret_stmt = t.ret(x_ref);
    let id_body = t.block(vec![ret_stmt]);
    let t_sig = t.ground("T");
    let id_fn = t.function("id", vec![tp], vec![x], t_sig, id_body);

    let one = t.int(1);
    let call = t.call("id", vec![], vec![one]);
    let call_id = call.id;
    let i64_sig = t.ground("I64");
    let bind = t.let_typed("y", i64_sig, call);
    let main_body = t.block(vec![bind]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![id_fn, main]);

    let analysis = run_default(&file).unwrap();
    assert_eq!(analysis.tables.type_of(call_id).to_string(), "I64");
}

#[test]
fn test_explicit_type_argument_mismatch_is_reported() {
    // id<Bool>(1) pins T to Bool, so the I64 argument no longer fits.
    let mut t = Tree::new();
    let tp = t.type_param("T", false);
    let x_sig = t.ground("T");
    let x = t.param("x", x_sig);
    let x_ref = t.name("x");
    let ret_stmt = t.ret(x_ref);
    let id_body = t.block(vec![ret_stmt]);
    let t_sig = t.ground("T");
    let id_fn = t.function("id", vec![tp], vec![x], t_sig, id_body);

    let one = t.int(1);
    let bool_sig = t.ground("Bool");
    let call = t.call("id", vec![bool_sig], vec![one]);
    let bind = t.let_("y", call);
    let main_body = t.block(vec![bind]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![id_fn, main]);

    let errs = run_default(&file).unwrap_err();
    let (code, message) = single_error(&errs);
    assert_eq!(code, ErrorCode::TYPE_MISMATCH);
    assert!(message.contains("Bool"), "message: {message}");
}

#[test]
fn test_fin_argument_is_inferred_from_a_literal_bound() {
    // fn shout<N fin>(s: String<N>): String<N> { return s }
    // let v: String<5> = shout("hi")
    let mut t = Tree::new();
    let n = t.type_param("N", true);
    let n_arg = t.ground("N");
    let s_sig = t.parameterized("String", vec![n_arg]);
    let s = t.param("s", s_sig);
    let s_ref = t.name("s");
    let ret_stmt = t.ret(s_ref);
    let shout_body = t.block(vec![ret_stmt]);
    let n_ret = t.ground("N");
    let ret_sig = t.parameterized("String", vec![n_ret]);
    let shout = t.function("shout", vec![n], vec![s], ret_sig, shout_body);

    let lit = t.string("hi");
    let call = t.call("shout", vec![], vec![lit]);
    let call_id = call.id;
    let five = t.bound(5);
    let v_sig = t.parameterized("String", vec![five]);
    let bind = t.let_typed("v", v_sig, call);
    let main_body = t.block(vec![bind]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![shout, main]);

    let analysis = run_default(&file).unwrap();
    assert_eq!(analysis.tables.type_of(call_id).to_string(), "String<2>");
}

#[test]
fn test_generic_record_field_access_replays_the_binding() {
    // record Wrap<T> { value: T }
    // fn main(): I64 { let w = Wrap(1); return w.value }
    let mut t = Tree::new();
    let tp = t.type_param("T", false);
    let t_sig = t.ground("T");
    let value = t.field("value", t_sig, false);
    let wrap = Def::Record(t.record("Wrap", vec![tp], vec![value]));

    let one = t.int(1);
    let ctor = t.call("Wrap", vec![], vec![one]);
    let bind = t.let_("w", ctor);
    let w = t.name("w");
    let access = t.member(w, "value");
    let access_id = access.id;
    let ret_stmt = t.ret(access);
    let main_body = t.block(vec![bind, ret_stmt]);
    let i64_sig = t.ground("I64");
    let main = t.function("main", vec![], vec![], i64_sig, main_body);
    let file = t.file(vec![wrap, main]);

    let analysis = run_default(&file).unwrap();
    assert_eq!(analysis.tables.type_of(access_id).to_string(), "I64");
}

// ══════════════════════════════════════════════════════════════════════════════
// Sums and platform types
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_sum_members_construct_as_the_owning_sum() {
    // sum Shape { record Circle { r: I64 }  object Dot }
    let mut t = Tree::new();
    let r_sig = t.ground("I64");
    let r = t.field("r", r_sig, false);
    let circle = SumMember::Record(t.record("Circle", vec![], vec![r]));
    let dot = SumMember::Object(t.object("Dot", vec![]));
    let shape = t.sum("Shape", vec![circle, dot]);

    let three = t.int(3);
    let ctor = t.call("Shape.Circle", vec![], vec![three]);
    let shape_sig = t.ground("Shape");
    let bind_a = t.let_typed("a", shape_sig, ctor);
    let dot_ref = t.name("Shape.Dot");
    let shape_sig = t.ground("Shape");
    let bind_b = t.let_typed("b", shape_sig, dot_ref);
    let main_body = t.block(vec![bind_a, bind_b]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![shape, main]);

    assert!(run_default(&file).is_ok());
}

#[test]
fn test_option_construction_and_none_literal() {
    // let o: Option<I64> = Option.Some(1); let n: Option<I64> = Option.None
    let mut t = Tree::new();
    let one = t.int(1);
    let some = t.call("Option.Some", vec![], vec![one]);
    let some_id = some.id;
    let i64_sig = t.ground("I64");
    let o_sig = t.parameterized("Option", vec![i64_sig]);
    let bind_o = t.let_typed("o", o_sig, some);

    let none = t.name("Option.None");
    let i64_sig = t.ground("I64");
    let n_sig = t.parameterized("Option", vec![i64_sig]);
    let bind_n = t.let_typed("n", n_sig, none);

    let main_body = t.block(vec![bind_o, bind_n]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![main]);

    let analysis = run_default(&file).unwrap();
    assert_eq!(analysis.tables.type_of(some_id).to_string(), "Option<I64>");
}

#[test]
fn test_builtin_members_and_free_functions_resolve() {
    let mut t = Tree::new();
    let lit = t.string("abc");
    let length = t.method(lit, "length", vec![]);
    let length_id = length.id;
    let bind_n = t.let_("n", length);

    let one = t.int(1);
    let two = t.int(2);
    let max = t.call("max", vec![], vec![one, two]);
    let max_id = max.id;
    let bind_m = t.let_("m", max);

    let lhs = t.int(1);
    let rhs = t.int(2);
    let plus = t.method(lhs, "plus", vec![rhs]);
    let bind_s = t.let_("s", plus);

    let main_body = t.block(vec![bind_n, bind_m, bind_s]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![main]);

    let analysis = run_default(&file).unwrap();
    assert_eq!(analysis.tables.type_of(length_id).to_string(), "U32");
    assert_eq!(analysis.tables.type_of(max_id).to_string(), "I64");
}

// ══════════════════════════════════════════════════════════════════════════════
// Type errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_mismatched_let_reports_exactly_one_error() {
    let mut t = Tree::new();
    let lit = t.string("hi");
    let i64_sig = t.ground("I64");
    let bind = t.let_typed("x", i64_sig, lit);
    let main_body = t.block(vec![bind]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![main]);

    let errs = run_default(&file).unwrap_err();
    let (code, message) = single_error(&errs);
    assert_eq!(code, ErrorCode::TYPE_MISMATCH);
    assert!(message.contains("expected I64"), "message: {message}");
}

#[test]
fn test_unknown_name_reports_not_found() {
    let mut t = Tree::new();
    let unknown = t.name("whatever");
    let bind = t.let_("u", unknown);
    let main_body = t.block(vec![bind]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![main]);

    let errs = run_default(&file).unwrap_err();
    let (code, _) = single_error(&errs);
    assert_eq!(code, ErrorCode::SYMBOL_NOT_FOUND);
}

#[test]
fn test_empty_list_literal_cannot_be_inferred() {
    let mut t = Tree::new();
    let empty = t.list(vec![]);
    let bind = t.let_("e", empty);
    let main_body = t.block(vec![bind]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![main]);

    let errs = run_default(&file).unwrap_err();
    let (code, message) = single_error(&errs);
    assert_eq!(code, ErrorCode::CANNOT_INFER_TYPE_PARAMETER);
    assert!(message.contains("empty list"), "message: {message}");
}

#[test]
fn test_if_condition_must_be_boolean() {
    let mut t = Tree::new();
    let one = t.int(1);
    let then_block = t.block(vec![]);
    let cond = t.if_else(one, then_block, None);
    let main_body = t.block(vec![Stmt::Expr(cond)]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![main]);

    let errs = run_default(&file).unwrap_err();
    let (code, message) = single_error(&errs);
    assert_eq!(code, ErrorCode::TYPE_MISMATCH);
    assert!(message.contains("expected Bool"), "message: {message}");
}

#[test]
fn test_if_branches_unify_to_the_wider_type() {
    // fn pick(c: Bool): I64 { return if c { 1 } else { 2 } }
    let mut t = Tree::new();
    let bool_sig = t.ground("Bool");
    let c = t.param("c", bool_sig);
    let one = t.int(1);
    let then_block = t.block(vec![Stmt::Expr(one)]);
    let two = t.int(2);
    let else_block = t.block(vec![Stmt::Expr(two)]);
    let cond = t.name("c");
    let branch = t.if_else(cond, then_block, Some(else_block));
    let branch_id = branch.id;
    let ret_stmt = t.ret(branch);
    let body = t.block(vec![ret_stmt]);
    let i64_sig = t.ground("I64");
    let pick = t.function("pick", vec![], vec![c], i64_sig, body);
    let file = t.file(vec![pick]);

    let analysis = run_default(&file).unwrap();
    assert_eq!(analysis.tables.type_of(branch_id).to_string(), "I64");
}

#[test]
fn test_incompatible_branches_are_rejected() {
    let mut t = Tree::new();
    let bool_sig = t.ground("Bool");
    let c = t.param("c", bool_sig);
    let one = t.int(1);
    let then_block = t.block(vec![Stmt::Expr(one)]);
    let text = t.string("x");
    let else_block = t.block(vec![Stmt::Expr(text)]);
    let cond = t.name("c");
    let branch = t.if_else(cond, then_block, Some(else_block));
    let ret_stmt = t.ret(branch);
    let body = t.block(vec![ret_stmt]);
    let i64_sig = t.ground("I64");
    let pick = t.function("pick", vec![], vec![c], i64_sig, body);
    let file = t.file(vec![pick]);

    let errs = run_default(&file).unwrap_err();
    let (code, _) = single_error(&errs);
    assert_eq!(code, ErrorCode::CANNOT_UNIFY_BRANCHES);
}

#[test]
fn test_duplicate_top_level_definition_is_rejected() {
    let mut t = Tree::new();
    let body = t.block(vec![]);
    let nothing = t.ground("Nothing");
    let first = t.function("f", vec![], vec![], nothing, body);
    let body = t.block(vec![]);
    let nothing = t.ground("Nothing");
    let second = t.function("f", vec![], vec![], nothing, body);
    let file = t.file(vec![first, second]);

    let errs = run_default(&file).unwrap_err();
    let (code, _) = single_error(&errs);
    assert_eq!(code, ErrorCode::DUPLICATE_DEFINITION);
}

// ══════════════════════════════════════════════════════════════════════════════
// Mutability
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_assignment_to_immutable_binding_is_rejected() {
    let mut t = Tree::new();
    let one = t.int(1);
    let bind = t.let_("x", one);
    let two = t.int(2);
    let write = t.assign(&["x"], two);
    let main_body = t.block(vec![bind, write]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![main]);

    let errs = run_default(&file).unwrap_err();
    let (code, message) = single_error(&errs);
    assert_eq!(code, ErrorCode::IMMUTABLE_TARGET);
    assert!(message.contains("'x'"), "message: {message}");
}

#[test]
fn test_assignment_to_mutable_binding_is_allowed() {
    let mut t = Tree::new();
    let one = t.int(1);
    let bind = t.let_mut("y", one);
    let two = t.int(2);
    let write = t.assign(&["y"], two);
    let main_body = t.block(vec![bind, write]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![main]);

    assert!(run_default(&file).is_ok());
}

#[test]
fn test_field_mutability_is_enforced_per_field() {
    // record Point { mut x: I64, y: I64 } — p.x = 3 is fine, p.y = 4 is not.
    let mut t = Tree::new();
    let x_sig = t.ground("I64");
    let x = t.field("x", x_sig, true);
    let y_sig = t.ground("I64");
    let y = t.field("y", y_sig, false);
    let point = Def::Record(t.record("Point", vec![], vec![x, y]));

    let one = t.int(1);
    let two = t.int(2);
    let ctor = t.call("Point", vec![], vec![one, two]);
    let bind = t.let_mut("p", ctor);
    let three = t.int(3);
    let write_x = t.assign(&["p", "x"], three);
    let four = t.int(4);
    let write_y = t.assign(&["p", "y"], four);
    let main_body = t.block(vec![bind, write_x, write_y]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![point, main]);

    let errs = run_default(&file).unwrap_err();
    let (code, message) = single_error(&errs);
    assert_eq!(code, ErrorCode::IMMUTABLE_TARGET);
    assert!(message.contains("'y'"), "message: {message}");
}

// ══════════════════════════════════════════════════════════════════════════════
// Feature bans
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_iterating_an_unordered_container_is_banned() {
    let mut t = Tree::new();
    let one = t.int(1);
    let lit = t.set(vec![one]);
    let bind = t.let_("s", lit);
    let loop_body = t.block(vec![]);
    let s = t.name("s");
    let each = t.foreach("x", s, loop_body);
    let main_body = t.block(vec![bind, Stmt::Expr(each)]);
    let nothing = t.ground("Nothing");
    let main = t.function("main", vec![], vec![], nothing, main_body);
    let file = t.file(vec![main]);

    let errs = run_default(&file).unwrap_err();
    let (code, message) = single_error(&errs);
    assert_eq!(code, ErrorCode::FEATURE_BANNED);
    assert!(message.contains("Set"), "message: {message}");
}
