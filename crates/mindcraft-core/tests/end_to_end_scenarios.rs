//! End-to-end scenarios exercising the parser, type engine, and suggestion
//! engine together against one small fixture catalog, rather than any one
//! module in isolation.

use mindcraft_core::ast::{Expr, ExprKind, SlotExpr};
use mindcraft_core::bitset::RuleSide;
use mindcraft_core::diag::{ParseDiagCode, TypeDiagCode};
use mindcraft_core::ids::{FnId, NodeId, TileId, TypeId};
use mindcraft_core::registry::{
    ArgKind, ArgNode, CallDef, CallSpec, Ctx, FunctionEntry, InMemoryConversionRegistry, InMemoryFunctionRegistry,
    InMemoryOperatorTable, InMemoryTileCatalog, InMemoryTypeRegistry, TypeDef,
};
use mindcraft_core::suggest::{count_unclosed_parens, suggest_tiles, Compatibility, InsertionContext};
use mindcraft_core::tile::{TileDef, TileKind, Value};
use mindcraft_core::{compute_inferred_types, parse_brain_tiles, parse_rule, TypeEnv};
use pretty_assertions::assert_eq;

const NUMBER: TypeId = TypeId(2);
const STRING: TypeId = TypeId(3);
const BOOLEAN: TypeId = TypeId(4);
const PAGE: TypeId = TypeId(5);

const VAR_PAGE: TileId = TileId(1);
const LIT_NUMBER: TileId = TileId(2);
const LIT_STRING: TileId = TileId(3);
const SWITCH_PAGE: TileId = TileId(4);
const ANON_STRING_MARKER: TileId = TileId(10);

const SLOWLY_MODIFIER: TileId = TileId(20);
const PRIORITY_PARAM: TileId = TileId(21);
const MOVE_ACTUATOR: TileId = TileId(22);

const EVERY_MODIFIER: TileId = TileId(30);
const INTERVAL_PARAM: TileId = TileId(31);
const CHECK_TEMPERATURE: TileId = TileId(32);

const ID_ACCESSOR: TileId = TileId(41);
const TITLE_ACCESSOR: TileId = TileId(42);
const ASSIGN_OP: TileId = TileId(43);

const ANON_NUMBER_MARKER: TileId = TileId(51);
const READ_VALUE: TileId = TileId(52);
const LIT_BOOLEAN: TileId = TileId(55);

/// Builds the fixture's five registries (mirrors `typeck.rs`'s own
/// `build_ctx` helper: return the owned stores, let each test wire up its
/// own [`Ctx`] borrow).
fn build_registries() -> (
    InMemoryTileCatalog,
    InMemoryTypeRegistry,
    InMemoryOperatorTable,
    InMemoryConversionRegistry,
    InMemoryFunctionRegistry,
) {
    let mut types = InMemoryTypeRegistry::new();
    types.register(TypeDef::primitive(NUMBER, "Number", mindcraft_core::registry::CoreType::Number));
    types.register(TypeDef::primitive(STRING, "String", mindcraft_core::registry::CoreType::String));
    types.register(TypeDef::primitive(BOOLEAN, "Boolean", mindcraft_core::registry::CoreType::Boolean));
    types.register(TypeDef::strukt(PAGE, "Page", vec![("id".into(), NUMBER), ("title".into(), STRING)]));

    let mut conversions = InMemoryConversionRegistry::new();
    conversions.register(NUMBER, STRING, 1);

    let mut tiles = InMemoryTileCatalog::new();
    let mut functions = InMemoryFunctionRegistry::new();

    tiles.register(TileDef::new(
        VAR_PAGE,
        TileKind::Variable {
            var_name: "current_page".into(),
            var_type: PAGE,
            unique_id: 1,
        },
    ));
    tiles.register(TileDef::new(
        LIT_NUMBER,
        TileKind::Literal {
            value_type: NUMBER,
            value: Value::Number(7.0),
            value_label: "7".into(),
        },
    ));
    tiles.register(TileDef::new(
        LIT_STRING,
        TileKind::Literal {
            value_type: STRING,
            value: Value::Text("home".into()),
            value_label: "home".into(),
        },
    ));
    tiles.register(TileDef::new(
        LIT_BOOLEAN,
        TileKind::Literal {
            value_type: BOOLEAN,
            value: Value::Boolean(true),
            value_label: "true".into(),
        },
    ));
    tiles.register(TileDef::new(
        ANON_STRING_MARKER,
        TileKind::Literal {
            value_type: STRING,
            value: Value::Text(String::new()),
            value_label: "AnonString".into(),
        },
    ));
    tiles.register(TileDef::new(
        ANON_NUMBER_MARKER,
        TileKind::Literal {
            value_type: NUMBER,
            value: Value::Number(0.0),
            value_label: "AnonNumber".into(),
        },
    ));

    // switch-page(page_id: String) — scenario 1.
    let switch_page_call_def = CallDef::new(CallSpec::Arg(ArgNode::new(ANON_STRING_MARKER, ArgKind::Anonymous)));
    functions.register(FunctionEntry {
        fn_id: FnId(1),
        call_def: switch_page_call_def,
    });
    tiles.register(TileDef::new(
        SWITCH_PAGE,
        TileKind::Actuator {
            actuator_id: "switch-page".into(),
            function_entry: FnId(1),
        },
    ));

    // move(slowly*, priority?) — scenario 2: a repeat interleaved with an
    // optional named parameter inside one bag.
    tiles.register(TileDef::new(SLOWLY_MODIFIER, TileKind::Modifier { modifier_id: "slowly".into() }));
    tiles.register(TileDef::new(
        PRIORITY_PARAM,
        TileKind::Parameter {
            parameter_id: "priority".into(),
            data_type: NUMBER,
        },
    ));
    let move_call_def = CallDef::new(CallSpec::Bag {
        name: None,
        items: vec![
            CallSpec::Optional {
                name: None,
                item: Box::new(CallSpec::Repeat {
                    name: None,
                    item: Box::new(CallSpec::Arg(ArgNode::new(
                        SLOWLY_MODIFIER,
                        ArgKind::Modifier { tile_id: SLOWLY_MODIFIER },
                    ))),
                    min: 0,
                    max: Some(3),
                }),
            },
            CallSpec::Optional {
                name: None,
                item: Box::new(CallSpec::Arg(
                    ArgNode::new(PRIORITY_PARAM, ArgKind::Parameter { tile_id: PRIORITY_PARAM })
                        .optional()
                        .named("priority"),
                )),
            },
        ],
    });
    functions.register(FunctionEntry {
        fn_id: FnId(2),
        call_def: move_call_def,
    });
    tiles.register(TileDef::new(
        MOVE_ACTUATOR,
        TileKind::Actuator {
            actuator_id: "move".into(),
            function_entry: FnId(2),
        },
    ));

    // check-temperature(every?, interval if every) — scenario 3: a
    // conditional branch gated on a sibling modifier's name.
    tiles.register(TileDef::new(EVERY_MODIFIER, TileKind::Modifier { modifier_id: "every".into() }));
    tiles.register(TileDef::new(
        INTERVAL_PARAM,
        TileKind::Parameter {
            parameter_id: "interval".into(),
            data_type: NUMBER,
        },
    ));
    let check_temperature_call_def = CallDef::new(CallSpec::Seq {
        name: None,
        items: vec![
            CallSpec::Arg(ArgNode::new(ANON_NUMBER_MARKER, ArgKind::Anonymous)),
            CallSpec::Optional {
                name: None,
                item: Box::new(CallSpec::Arg(
                    ArgNode::new(EVERY_MODIFIER, ArgKind::Modifier { tile_id: EVERY_MODIFIER })
                        .optional()
                        .named("every"),
                )),
            },
            CallSpec::Conditional {
                name: None,
                condition: "every".into(),
                then_branch: Box::new(CallSpec::Arg(ArgNode::new(
                    INTERVAL_PARAM,
                    ArgKind::Parameter { tile_id: INTERVAL_PARAM },
                ))),
                else_branch: None,
            },
        ],
    });
    functions.register(FunctionEntry {
        fn_id: FnId(3),
        call_def: check_temperature_call_def,
    });
    tiles.register(TileDef::new(
        CHECK_TEMPERATURE,
        TileKind::Sensor {
            sensor_id: "check-temperature".into(),
            output_type: NUMBER,
            function_entry: FnId(3),
        },
    ));

    // Page.id (read-only) / Page.title (writable) accessors, plus an
    // assignment operator — scenario 4.
    tiles.register(TileDef::new(
        ID_ACCESSOR,
        TileKind::Accessor {
            struct_type_id: PAGE,
            field_name: "id".into(),
            field_type_id: NUMBER,
            read_only: true,
        },
    ));
    tiles.register(TileDef::new(
        TITLE_ACCESSOR,
        TileKind::Accessor {
            struct_type_id: PAGE,
            field_name: "title".into(),
            field_type_id: STRING,
            read_only: false,
        },
    ));
    tiles.register(TileDef::new(
        ASSIGN_OP,
        TileKind::Operator {
            op_id: mindcraft_core::ids::OpId(1),
            fixity: mindcraft_core::tile::Fixity::Infix,
            precedence: 1,
            is_assignment: true,
        },
    ));

    // read-value(choice(AnonNumber, AnonString)) — scenario 5.
    let read_value_call_def = CallDef::new(CallSpec::Choice {
        name: None,
        options: vec![
            CallSpec::Arg(ArgNode::new(ANON_NUMBER_MARKER, ArgKind::Anonymous)),
            CallSpec::Arg(ArgNode::new(ANON_STRING_MARKER, ArgKind::Anonymous)),
        ],
    });
    functions.register(FunctionEntry {
        fn_id: FnId(4),
        call_def: read_value_call_def,
    });
    tiles.register(TileDef::new(
        READ_VALUE,
        TileKind::Actuator {
            actuator_id: "read-value".into(),
            function_entry: FnId(4),
        },
    ));

    (tiles, types, InMemoryOperatorTable::new(), conversions, functions)
}

fn ctx_from<'a>(
    tiles: &'a InMemoryTileCatalog,
    types: &'a InMemoryTypeRegistry,
    ops: &'a InMemoryOperatorTable,
    conversions: &'a InMemoryConversionRegistry,
    functions: &'a InMemoryFunctionRegistry,
) -> Ctx<'a> {
    Ctx::new(tiles, types, ops, conversions, functions)
}

fn leaf(node_id: u32, kind: ExprKind, span: (usize, usize)) -> Expr {
    Expr {
        node_id: NodeId(node_id),
        kind,
        span: Some(mindcraft_core::diag::Span::new(span.0, span.1)),
    }
}

/// Scenario 1: `switch-page`'s string-typed slot accepts a Number literal by
/// inserting the registered implicit conversion and emitting
/// `DataTypeConverted` rather than failing with a mismatch.
#[test]
fn switch_page_widens_number_literal_to_string() {
    let (tiles, types, ops, conversions, functions) = build_registries();
    let ctx = ctx_from(&tiles, &types, &ops, &conversions, &functions);

    let literal = leaf(0, ExprKind::Literal { tile: LIT_NUMBER }, (1, 2));
    let actuator = leaf(
        1,
        ExprKind::Actuator {
            tile: SWITCH_PAGE,
            anons: smallvec::smallvec![SlotExpr {
                slot_id: 0,
                expr: Box::new(literal),
            }],
            parameters: smallvec::smallvec![],
            modifiers: smallvec::smallvec![],
        },
        (0, 2),
    );

    let mut env = TypeEnv::new();
    let diags = compute_inferred_types(&actuator, &ctx, &mut env);

    assert!(diags.iter().any(|d| d.code == TypeDiagCode::DataTypeConverted));
    assert!(diags.iter().all(|d| d.code != TypeDiagCode::DataTypeMismatch));
    assert_eq!(env.get(NodeId(0)).unwrap().conversion.unwrap().to, STRING);
}

/// Scenario 2: a bag with one `repeat` modifier interleaved against one
/// optional named parameter — both items fill from a single tile pass, the
/// repeat matching twice before the parameter's turn comes up.
#[test]
fn move_bag_interleaves_repeat_and_optional_parameter() {
    let (tiles, types, ops, conversions, functions) = build_registries();
    let ctx = ctx_from(&tiles, &types, &ops, &conversions, &functions);

    let sequence = [MOVE_ACTUATOR, SLOWLY_MODIFIER, SLOWLY_MODIFIER, PRIORITY_PARAM, LIT_NUMBER];
    let result = parse_brain_tiles(&sequence, &ctx, None, None).expect("valid range");

    assert_eq!(result.diags, vec![]);
    assert_eq!(result.exprs.len(), 1);
    let ExprKind::Actuator { modifiers, parameters, anons, .. } = &result.exprs[0].kind else {
        panic!("expected an actuator node, got {:?}", result.exprs[0].kind);
    };
    assert_eq!(modifiers.len(), 2);
    assert_eq!(parameters.len(), 1);
    assert!(anons.is_empty());
    assert_eq!(modifiers[0].slot_id, modifiers[1].slot_id);
}

/// Scenario 3: `check-temperature`'s `interval` parameter is only parsed
/// when the `every` modifier was present, via a `conditional` node gated on
/// a sibling's match name. Its leading anonymous threshold slot is
/// required, so omitting it is a parse failure, not a silently empty call.
#[test]
fn check_temperature_conditional_follows_every_modifier() {
    let (tiles, types, ops, conversions, functions) = build_registries();
    let ctx = ctx_from(&tiles, &types, &ops, &conversions, &functions);

    let with_every = [CHECK_TEMPERATURE, LIT_NUMBER, EVERY_MODIFIER, INTERVAL_PARAM, LIT_NUMBER];
    let result = parse_brain_tiles(&with_every, &ctx, None, None).expect("valid range");
    assert_eq!(result.diags, vec![]);
    let ExprKind::Sensor { anons, modifiers, parameters, .. } = &result.exprs[0].kind else {
        panic!("expected a sensor node");
    };
    assert_eq!(anons.len(), 1);
    assert_eq!(modifiers.len(), 1);
    assert_eq!(parameters.len(), 1);

    let without_every = [CHECK_TEMPERATURE, LIT_NUMBER];
    let result = parse_brain_tiles(&without_every, &ctx, None, None).expect("valid range");
    assert_eq!(result.diags, vec![]);
    let ExprKind::Sensor { anons, modifiers, parameters, .. } = &result.exprs[0].kind else {
        panic!("expected a sensor node");
    };
    assert_eq!(anons.len(), 1);
    assert!(modifiers.is_empty());
    assert!(parameters.is_empty());
}

/// Scenario 3 failure path: omitting the required anonymous threshold
/// argument entirely fails the call spec and emits `ActionCallParseFailure`.
#[test]
fn check_temperature_missing_required_anon_emits_parse_failure() {
    let (tiles, types, ops, conversions, functions) = build_registries();
    let ctx = ctx_from(&tiles, &types, &ops, &conversions, &functions);

    let missing_threshold = [CHECK_TEMPERATURE];
    let result = parse_brain_tiles(&missing_threshold, &ctx, None, None).expect("valid range");
    assert!(result.diags.iter().any(|d| d.code == ParseDiagCode::ActionCallParseFailure));
}

/// Scenario 4: assigning into a read-only field access is rejected with
/// `ReadOnlyFieldAssignment`; the same assignment into a writable field on
/// the same struct succeeds cleanly.
#[test]
fn read_only_accessor_rejects_assignment_writable_one_does_not() {
    let (tiles, types, ops, conversions, functions) = build_registries();
    let ctx = ctx_from(&tiles, &types, &ops, &conversions, &functions);

    let read_only_attempt = [VAR_PAGE, ID_ACCESSOR, ASSIGN_OP, LIT_NUMBER];
    let result = parse_brain_tiles(&read_only_attempt, &ctx, None, None).expect("valid range");
    assert_eq!(result.diags.len(), 1);
    assert_eq!(result.diags[0].code, ParseDiagCode::ReadOnlyFieldAssignment);
    assert!(result.exprs[0].is_error());

    let writable_attempt = [VAR_PAGE, TITLE_ACCESSOR, ASSIGN_OP, LIT_STRING];
    let result = parse_brain_tiles(&writable_attempt, &ctx, None, None).expect("valid range");
    assert_eq!(result.diags, vec![]);
    assert!(matches!(result.exprs[0].kind, ExprKind::Assignment { .. }));
}

/// Scenario 5: replacing an unfilled anonymous slot inside an unresolved
/// `choice(AnonNumber, AnonString)` offers tiles matching *either* sibling's
/// expected type, and nothing that matches neither.
#[test]
fn choice_siblings_both_offered_for_unfilled_anon_slot() {
    let (tiles, types, ops, conversions, functions) = build_registries();
    let ctx = ctx_from(&tiles, &types, &ops, &conversions, &functions);

    let action_expr = leaf(
        0,
        ExprKind::Actuator {
            tile: READ_VALUE,
            anons: smallvec::smallvec![],
            parameters: smallvec::smallvec![],
            modifiers: smallvec::smallvec![],
        },
        (0, 1),
    );
    let insertion = InsertionContext {
        rule_side: RuleSide::Do,
        expected_type: None,
        expr: Some(&action_expr),
        replace_tile_index: None,
        available_capabilities: None,
        unclosed_paren_depth: 0,
    };

    let suggestions = suggest_tiles(&insertion, &ctx);
    let exact_ids: Vec<TileId> = suggestions.exact.iter().map(|s| s.tile_def.tile_id).collect();

    assert!(exact_ids.contains(&LIT_NUMBER), "expected the number literal to be offered: {exact_ids:?}");
    assert!(exact_ids.contains(&LIT_STRING), "expected the string literal to be offered: {exact_ids:?}");
    assert!(!exact_ids.contains(&LIT_BOOLEAN), "boolean literal matches neither choice branch");
}

/// Scenario 6: a struct-typed variable is still offered where a field of its
/// struct type matches the expected type exactly (the "struct drill-down"
/// classification step), at cost 1 rather than being dropped.
#[test]
fn struct_drill_down_offers_variable_via_matching_field() {
    let (tiles, types, ops, conversions, functions) = build_registries();
    let ctx = ctx_from(&tiles, &types, &ops, &conversions, &functions);

    let insertion = InsertionContext {
        rule_side: RuleSide::Do,
        expected_type: Some(STRING),
        expr: None,
        replace_tile_index: None,
        available_capabilities: None,
        unclosed_paren_depth: 0,
    };

    let suggestions = suggest_tiles(&insertion, &ctx);
    let via_drill_down = suggestions
        .with_conversion
        .iter()
        .find(|s| s.tile_def.tile_id == VAR_PAGE)
        .expect("Page-typed variable should be suggested via its title field");

    assert_eq!(via_drill_down.compatibility, Compatibility::Conversion);
    assert_eq!(via_drill_down.conversion_cost, 1);
}

/// `parse_rule` bundles both rule sides' parses with independently-scoped
/// type environments — a `when`-side and `do`-side node sharing the same
/// numeric id must not collide.
#[test]
fn parse_rule_keeps_when_and_do_type_envs_independent() {
    let (tiles, types, ops, conversions, functions) = build_registries();
    let ctx = ctx_from(&tiles, &types, &ops, &conversions, &functions);

    let when_tiles = [LIT_NUMBER];
    let do_tiles = [LIT_STRING];
    let result = parse_rule(&when_tiles, &do_tiles, &ctx).expect("valid range");

    assert_eq!(result.parse_result.exprs.len(), 2);
    assert_eq!(result.type_info.when.get(NodeId(0)).unwrap().inferred, NUMBER);
    assert_eq!(result.type_info.r#do.get(NodeId(0)).unwrap().inferred, STRING);
}

/// `count_unclosed_parens` clamps at zero and ignores the excluded index,
/// matching the depth the suggestion engine needs when re-deriving context
/// around the tile currently being replaced.
#[test]
fn count_unclosed_parens_clamps_and_respects_exclusion() {
    let (tiles, types, ops, conversions, functions) = build_registries();
    let ctx = ctx_from(&tiles, &types, &ops, &conversions, &functions);

    // No control-flow tiles registered in this fixture, so parens are
    // always at depth zero regardless of which plain-value tiles appear.
    let sequence = [LIT_NUMBER, LIT_STRING, LIT_NUMBER];
    assert_eq!(count_unclosed_parens(&sequence, &ctx, None), 0);
    assert_eq!(count_unclosed_parens(&sequence, &ctx, Some(1)), 0);
}
