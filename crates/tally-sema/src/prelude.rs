//! Built-in type and function registry.
//!
//! The prelude owns every platform terminus (scalars, bounded containers,
//! `Option`/`Either`) and every built-in member, each member carrying its own
//! [`CostExpression`] and per-parameter cost multipliers. It installs itself
//! into an import-aggregation scope at the start of analysis; the rest of
//! the pipeline only ever sees ordinary symbols.

use std::collections::HashMap;
use std::rc::Rc;

use crate::cost::CostExpression;
use crate::fault::Fault;
use crate::scope::{ScopeArena, ScopeId, NULL_SCOPE};
use crate::subst::SubstitutionChain;
use crate::symbol::{PluginFunction, PluginParam, Symbol};
use crate::tables::{Annotations, FieldInfo};
use crate::ty::{
    BasicType, Instantiation, ObjectDecl, RecordDecl, SumDecl, Type, TypeParameter,
};
use tally_types::ast::NodeIdGen;

/// Platform declarations get node ids from this base upward; user trees
/// number from zero and never collide.
pub const PRELUDE_NODE_BASE: u32 = 0x8000_0000;

/// All built-in types and functions.
#[derive(Debug)]
pub struct Prelude {
    /// Top-level type symbols with their import origin.
    termini: Vec<(&'static str, String, Symbol)>,
    /// Free built-in functions with their import origin.
    functions: Vec<(&'static str, Rc<PluginFunction>)>,
    /// Members per terminus name.
    members: HashMap<String, HashMap<String, Rc<PluginFunction>>>,
    /// Ground scalar types by name, for literal typing.
    grounds: HashMap<&'static str, Type>,
    string: Type,
    decimal: Type,
    list: Type,
    mutable_list: Type,
    set: Type,
    mutable_set: Type,
    dictionary: Type,
    mutable_dictionary: Type,
    pair: Type,
    option: Rc<SumDecl>,
    some: Rc<RecordDecl>,
    none: Rc<ObjectDecl>,
    either: Rc<SumDecl>,
    left: Rc<RecordDecl>,
    right: Rc<RecordDecl>,
}

/// Build an instantiation directly; prelude termini and their argument lists
/// are constructed together, so arity always matches.
fn inst(terminus: &Type, args: Vec<Type>) -> Type {
    let bindings = terminus
        .type_params()
        .iter()
        .cloned()
        .zip(args)
        .collect::<Vec<_>>();
    Type::Instantiation(Rc::new(Instantiation {
        terminus: terminus.clone(),
        chain: SubstitutionChain::of(bindings),
    }))
}

fn basic(name: &'static str, type_params: Vec<TypeParameter>, iterable: bool) -> Type {
    Type::Basic(Rc::new(BasicType {
        name,
        type_params,
        iterable,
    }))
}

fn std_param(name: &str) -> Type {
    Type::Parameter(TypeParameter::standard(name))
}

fn fin_param(name: &str) -> Type {
    Type::Parameter(TypeParameter::fin(name))
}

fn plugin(
    name: &str,
    params: Vec<PluginParam>,
    ret: Type,
    cost: CostExpression,
) -> Rc<PluginFunction> {
    Rc::new(PluginFunction {
        name: name.to_string(),
        type_params: Vec::new(),
        params,
        ret,
        cost,
    })
}

impl Prelude {
    pub fn new() -> Self {
        let grounds: HashMap<&'static str, Type> = [
            "Nothing", "Bool", "Char", "I8", "I16", "I32", "I64", "U8", "U16", "U32", "U64",
        ]
        .into_iter()
        .map(|n| (n, basic(n, vec![], false)))
        .collect();

        let string = basic("String", vec![TypeParameter::fin("N")], false);
        let decimal = basic("Decimal", vec![TypeParameter::fin("P")], false);
        let elem_fin = || vec![TypeParameter::standard("E"), TypeParameter::fin("N")];
        let key_val_fin = || {
            vec![
                TypeParameter::standard("K"),
                TypeParameter::standard("V"),
                TypeParameter::fin("N"),
            ]
        };
        let list = basic("List", elem_fin(), true);
        let mutable_list = basic("MutableList", elem_fin(), true);
        // Unordered containers: iteration over them is a banned feature.
        let set = basic("Set", elem_fin(), false);
        let mutable_set = basic("MutableSet", elem_fin(), false);
        let dictionary = basic("Dictionary", key_val_fin(), false);
        let mutable_dictionary = basic("MutableDictionary", key_val_fin(), false);
        let pair = basic(
            "Pair",
            vec![TypeParameter::standard("A"), TypeParameter::standard("B")],
            false,
        );

        let mut ids = NodeIdGen::starting_at(PRELUDE_NODE_BASE);
        let option = Rc::new(SumDecl {
            def: ids.next(),
            name: "Option".into(),
            type_params: vec![TypeParameter::standard("T")],
            members: vec!["Some".into(), "None".into()],
            platform: true,
        });
        let some = Rc::new(RecordDecl {
            def: ids.next(),
            name: "Some".into(),
            type_params: option.type_params.clone(),
            platform: true,
            owner: Some(option.clone()),
        });
        let none = Rc::new(ObjectDecl {
            def: ids.next(),
            name: "None".into(),
            platform: true,
            owner: Some(option.clone()),
        });
        let either = Rc::new(SumDecl {
            def: ids.next(),
            name: "Either".into(),
            type_params: vec![TypeParameter::standard("L"), TypeParameter::standard("R")],
            members: vec!["Left".into(), "Right".into()],
            platform: true,
        });
        let left = Rc::new(RecordDecl {
            def: ids.next(),
            name: "Left".into(),
            type_params: either.type_params.clone(),
            platform: true,
            owner: Some(either.clone()),
        });
        let right = Rc::new(RecordDecl {
            def: ids.next(),
            name: "Right".into(),
            type_params: either.type_params.clone(),
            platform: true,
            owner: Some(either.clone()),
        });

        let mut prelude = Self {
            termini: Vec::new(),
            functions: Vec::new(),
            members: HashMap::new(),
            grounds,
            string,
            decimal,
            list,
            mutable_list,
            set,
            mutable_set,
            dictionary,
            mutable_dictionary,
            pair,
            option,
            some,
            none,
            either,
            left,
            right,
        };
        prelude.register_termini();
        prelude.register_scalars();
        prelude.register_text();
        prelude.register_containers();
        prelude.register_math();
        prelude
    }

    // ──────────────────────────────────────────────────────────────────────
    // Registration
    // ──────────────────────────────────────────────────────────────────────

    fn register_termini(&mut self) {
        for name in [
            "Nothing", "Bool", "Char", "I8", "I16", "I32", "I64", "U8", "U16", "U32", "U64",
        ] {
            self.termini.push((
                "scalar",
                name.to_string(),
                Symbol::Builtin(self.grounds[name].clone()),
            ));
        }
        for (origin, ty) in [
            ("text", self.string.clone()),
            ("text", self.decimal.clone()),
            ("containers", self.list.clone()),
            ("containers", self.mutable_list.clone()),
            ("containers", self.set.clone()),
            ("containers", self.mutable_set.clone()),
            ("containers", self.dictionary.clone()),
            ("containers", self.mutable_dictionary.clone()),
            ("containers", self.pair.clone()),
        ] {
            self.termini
                .push((origin, ty.name().to_string(), Symbol::Builtin(ty)));
        }
        self.termini.push((
            "platform",
            "Option".into(),
            Symbol::Sum(self.option.clone()),
        ));
        self.termini.push((
            "platform",
            "Either".into(),
            Symbol::Sum(self.either.clone()),
        ));
    }

    fn add_member(&mut self, terminus: &str, func: Rc<PluginFunction>) {
        self.members
            .entry(terminus.to_string())
            .or_default()
            .insert(func.name.clone(), func);
    }

    /// Arithmetic, comparison, conversion and stringification on the scalar
    /// types, all at flat per-node cost.
    fn register_scalars(&mut self) {
        let bool_ty = self.grounds["Bool"].clone();
        let u32_ty = self.grounds["U32"].clone();
        // Widest printed forms, sign included.
        let to_string_width = [
            ("I8", 4u64),
            ("I16", 6),
            ("I32", 11),
            ("I64", 20),
            ("U8", 3),
            ("U16", 5),
            ("U32", 10),
            ("U64", 20),
        ];
        for (name, width) in to_string_width {
            let ty = self.grounds[name].clone();
            for op in ["plus", "minus", "times", "div", "rem"] {
                self.add_member(
                    name,
                    plugin(
                        op,
                        vec![PluginParam::plain(ty.clone())],
                        ty.clone(),
                        CostExpression::ConstantFin,
                    ),
                );
            }
            for op in ["lessThan", "atMost", "greaterThan", "atLeast"] {
                self.add_member(
                    name,
                    plugin(
                        op,
                        vec![PluginParam::plain(ty.clone())],
                        bool_ty.clone(),
                        CostExpression::ConstantFin,
                    ),
                );
            }
            self.add_member(
                name,
                plugin(
                    "toString",
                    vec![],
                    inst(&self.string, vec![Type::Cost(CostExpression::Fin(width))]),
                    CostExpression::Fin(width),
                ),
            );
        }
        for name in ["I8", "I16", "I32"] {
            self.add_member(
                name,
                plugin(
                    "toI64",
                    vec![],
                    self.grounds["I64"].clone(),
                    CostExpression::ConstantFin,
                ),
            );
        }
        for name in ["U8", "U16", "U32"] {
            self.add_member(
                name,
                plugin(
                    "toU64",
                    vec![],
                    self.grounds["U64"].clone(),
                    CostExpression::ConstantFin,
                ),
            );
        }
        for op in ["and", "or"] {
            self.add_member(
                "Bool",
                plugin(
                    op,
                    vec![PluginParam::plain(bool_ty.clone())],
                    bool_ty.clone(),
                    CostExpression::ConstantFin,
                ),
            );
        }
        self.add_member(
            "Bool",
            plugin("not", vec![], bool_ty, CostExpression::ConstantFin),
        );
        self.add_member(
            "Char",
            plugin("toU32", vec![], u32_ty, CostExpression::ConstantFin),
        );
    }

    /// String and decimal members. Decimal arithmetic scales with the
    /// declared precision, so its cost stays symbolic in `P`.
    fn register_text(&mut self) {
        let bool_ty = self.grounds["Bool"].clone();
        let u32_ty = self.grounds["U32"].clone();
        self.add_member(
            "String",
            plugin("length", vec![], u32_ty, CostExpression::ConstantFin),
        );
        self.add_member(
            "String",
            plugin("isEmpty", vec![], bool_ty, CostExpression::ConstantFin),
        );
        let p = CostExpression::FinParameter("P".into());
        for op in ["plus", "minus", "times"] {
            self.add_member(
                "Decimal",
                plugin(
                    op,
                    vec![PluginParam::plain(inst(&self.decimal, vec![fin_param("P")]))],
                    inst(&self.decimal, vec![fin_param("P")]),
                    p.clone(),
                ),
            );
        }
        self.add_member(
            "Decimal",
            plugin(
                "toString",
                vec![],
                inst(&self.string, vec![fin_param("P")]),
                p,
            ),
        );
    }

    fn register_containers(&mut self) {
        let bool_ty = self.grounds["Bool"].clone();
        let u32_ty = self.grounds["U32"].clone();
        let option_sum = Type::Sum(self.option.clone());
        let option_of = move |t: Type| inst(&option_sum, vec![t]);
        let hash_e = CostExpression::ParameterHashCode("E".into());
        let hash_k = CostExpression::ParameterHashCode("K".into());

        for name in ["List", "MutableList"] {
            self.add_member(
                name,
                plugin("size", vec![], u32_ty.clone(), CostExpression::ConstantFin),
            );
            self.add_member(
                name,
                plugin(
                    "get",
                    vec![PluginParam::plain(u32_ty.clone())],
                    option_of(std_param("E")),
                    CostExpression::ConstantFin,
                ),
            );
            self.add_member(
                name,
                plugin(
                    "first",
                    vec![],
                    option_of(std_param("E")),
                    CostExpression::ConstantFin,
                ),
            );
            // Linear scan: one comparison per element, up to the bound.
            self.add_member(
                name,
                plugin(
                    "contains",
                    vec![PluginParam::plain(std_param("E"))],
                    bool_ty.clone(),
                    CostExpression::product(vec![
                        CostExpression::FinParameter("N".into()),
                        hash_e.clone(),
                    ]),
                ),
            );
        }
        self.add_member(
            "MutableList",
            plugin(
                "push",
                vec![PluginParam::plain(std_param("E"))],
                bool_ty.clone(),
                CostExpression::ConstantFin,
            ),
        );
        self.add_member(
            "MutableList",
            plugin(
                "pop",
                vec![],
                option_of(std_param("E")),
                CostExpression::ConstantFin,
            ),
        );

        for name in ["Set", "MutableSet"] {
            self.add_member(
                name,
                plugin("size", vec![], u32_ty.clone(), CostExpression::ConstantFin),
            );
            self.add_member(
                name,
                plugin(
                    "contains",
                    vec![PluginParam::plain(std_param("E"))],
                    bool_ty.clone(),
                    hash_e.clone(),
                ),
            );
        }
        for op in ["add", "remove"] {
            self.add_member(
                "MutableSet",
                plugin(
                    op,
                    vec![PluginParam::plain(std_param("E"))],
                    bool_ty.clone(),
                    hash_e.clone(),
                ),
            );
        }

        for name in ["Dictionary", "MutableDictionary"] {
            self.add_member(
                name,
                plugin("size", vec![], u32_ty.clone(), CostExpression::ConstantFin),
            );
            self.add_member(
                name,
                plugin(
                    "get",
                    vec![PluginParam::plain(std_param("K"))],
                    option_of(std_param("V")),
                    hash_k.clone(),
                ),
            );
            self.add_member(
                name,
                plugin(
                    "containsKey",
                    vec![PluginParam::plain(std_param("K"))],
                    bool_ty.clone(),
                    hash_k.clone(),
                ),
            );
        }
        // The key is traversed twice on insert (probe + store), so its
        // argument cost is scaled.
        self.add_member(
            "MutableDictionary",
            plugin(
                "put",
                vec![
                    PluginParam::scaled(std_param("K"), CostExpression::Fin(2)),
                    PluginParam::plain(std_param("V")),
                ],
                option_of(std_param("V")),
                hash_k,
            ),
        );

        self.add_member(
            "Pair",
            plugin("first", vec![], std_param("A"), CostExpression::ConstantFin),
        );
        self.add_member(
            "Pair",
            plugin(
                "second",
                vec![],
                std_param("B"),
                CostExpression::ConstantFin,
            ),
        );
    }

    fn register_math(&mut self) {
        let i64 = self.grounds["I64"].clone();
        for name in ["min", "max"] {
            self.functions.push((
                "math",
                plugin(
                    name,
                    vec![
                        PluginParam::plain(i64.clone()),
                        PluginParam::plain(i64.clone()),
                    ],
                    i64.clone(),
                    CostExpression::ConstantFin,
                ),
            ));
        }
        self.functions.push((
            "math",
            plugin(
                "abs",
                vec![PluginParam::plain(i64.clone())],
                i64,
                CostExpression::ConstantFin,
            ),
        ));
    }

    // ──────────────────────────────────────────────────────────────────────
    // Installation
    // ──────────────────────────────────────────────────────────────────────

    /// Install every built-in into a fresh aggregation scope, with member
    /// scopes for the platform sum types.
    pub fn install(&self, arena: &mut ScopeArena) -> Result<ScopeId, Fault> {
        let scope = arena.alloc(NULL_SCOPE);
        for (origin, name, symbol) in &self.termini {
            arena.define_imported(scope, name, symbol.clone(), origin)?;
        }
        for (origin, func) in &self.functions {
            arena.define_imported(scope, &func.name, Symbol::Plugin(func.clone()), origin)?;
        }

        let option_members = arena.alloc(scope);
        arena.define(option_members, "Some", Symbol::Record(self.some.clone()))?;
        arena.define(option_members, "None", Symbol::Object(self.none.clone()))?;
        arena.set_member_scope(self.option.def, option_members);

        let either_members = arena.alloc(scope);
        arena.define(either_members, "Left", Symbol::Record(self.left.clone()))?;
        arena.define(either_members, "Right", Symbol::Record(self.right.clone()))?;
        arena.set_member_scope(self.either.def, either_members);

        Ok(scope)
    }

    /// Commit the platform records' field lists to the side tables, so
    /// construction sites resolve them like any user record.
    pub fn seed(&self, tables: &mut Annotations) -> Result<(), Fault> {
        tables.set_fields(
            self.some.def,
            vec![FieldInfo {
                name: "value".into(),
                ty: std_param("T"),
                mutable: false,
            }],
        )?;
        tables.set_fields(self.none.def, vec![])?;
        tables.set_fields(
            self.left.def,
            vec![FieldInfo {
                name: "value".into(),
                ty: std_param("L"),
                mutable: false,
            }],
        )?;
        tables.set_fields(
            self.right.def,
            vec![FieldInfo {
                name: "value".into(),
                ty: std_param("R"),
                mutable: false,
            }],
        )?;
        Ok(())
    }

    // ──────────────────────────────────────────────────────────────────────
    // Lookups
    // ──────────────────────────────────────────────────────────────────────

    /// A built-in member of the named terminus.
    pub fn member(&self, terminus: &str, name: &str) -> Option<Rc<PluginFunction>> {
        self.members.get(terminus)?.get(name).cloned()
    }

    /// `equals` and `hashCode` exist on every value; their cost depends on
    /// the receiver's own type, so they are synthesized per call site.
    pub fn universal_member(&self, name: &str, receiver: &Type) -> Option<Rc<PluginFunction>> {
        let cost = crate::cost::hash_cost(receiver);
        match name {
            "equals" => Some(plugin(
                "equals",
                vec![PluginParam::plain(receiver.clone())],
                self.grounds["Bool"].clone(),
                cost,
            )),
            "hashCode" => Some(plugin(
                "hashCode",
                vec![],
                self.grounds["U64"].clone(),
                cost,
            )),
            _ => None,
        }
    }

    // ──────────────────────────────────────────────────────────────────────
    // Types for literals
    // ──────────────────────────────────────────────────────────────────────

    pub fn ground(&self, name: &str) -> Option<Type> {
        self.grounds.get(name).cloned()
    }

    pub fn bool_ty(&self) -> Type {
        self.grounds["Bool"].clone()
    }

    /// The valueless type: blocks with no trailing expression, iteration,
    /// and `if` used purely as a statement.
    pub fn nothing_ty(&self) -> Type {
        self.grounds["Nothing"].clone()
    }

    pub fn char_ty(&self) -> Type {
        self.grounds["Char"].clone()
    }

    pub fn i64_ty(&self) -> Type {
        self.grounds["I64"].clone()
    }

    pub fn string_of(&self, bound: u64) -> Type {
        inst(&self.string, vec![Type::Cost(CostExpression::Fin(bound))])
    }

    pub fn decimal_of(&self, precision: u64) -> Type {
        inst(&self.decimal, vec![Type::Cost(CostExpression::Fin(precision))])
    }

    pub fn list_of(&self, elem: Type, bound: u64) -> Type {
        inst(
            &self.list,
            vec![elem, Type::Cost(CostExpression::Fin(bound))],
        )
    }

    pub fn set_of(&self, elem: Type, bound: u64) -> Type {
        inst(&self.set, vec![elem, Type::Cost(CostExpression::Fin(bound))])
    }

    pub fn dictionary_of(&self, key: Type, value: Type, bound: u64) -> Type {
        inst(
            &self.dictionary,
            vec![key, value, Type::Cost(CostExpression::Fin(bound))],
        )
    }

    pub fn pair_of(&self, first: Type, second: Type) -> Type {
        inst(&self.pair, vec![first, second])
    }

    pub fn option_decl(&self) -> &Rc<SumDecl> {
        &self.option
    }
}

impl Default for Prelude {
    fn default() -> Self {
        Self::new()
    }
}
