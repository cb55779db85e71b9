use std::{env, fs, process::ExitCode};

use mindcraft_core::bitset::RuleSide;
use mindcraft_core::ids::TileId;
use mindcraft_core::registry::{Ctx, InMemoryConversionRegistry, InMemoryFunctionRegistry, InMemoryOperatorTable, InMemoryTileCatalog, InMemoryTypeRegistry};
use mindcraft_core::suggest::{suggest_tiles, InsertionContext};
use mindcraft_core::tile::TileDef;
use mindcraft_core::{parse_rule, parse_tiles_for_suggestions};
use serde::Deserialize;

/// The on-disk schema for `tiles.json`: each entry is a full tile
/// definition rather than a bare id, so the file is simultaneously the
/// rule's two tile sequences and the catalog those ids resolve against.
#[derive(Debug, Deserialize)]
struct RuleFile {
    when: Vec<TileDef>,
    r#do: Vec<TileDef>,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let Some(file_path) = args.get(1) else {
        eprintln!("usage: mindcraft <tiles.json> [--suggest <tile_index>]");
        return ExitCode::FAILURE;
    };

    let rule = match read_rule_file(file_path) {
        Ok(rule) => rule,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut catalog = InMemoryTileCatalog::new();
    for def in rule.when.iter().chain(&rule.r#do) {
        catalog.register(def.clone());
    }
    let types = InMemoryTypeRegistry::new();
    let ops = InMemoryOperatorTable::new();
    let conversions = InMemoryConversionRegistry::new();
    let functions = InMemoryFunctionRegistry::new();
    let ctx = Ctx::new(&catalog, &types, &ops, &conversions, &functions);

    let when_ids: Vec<TileId> = rule.when.iter().map(|t| t.tile_id).collect();
    let do_ids: Vec<TileId> = rule.r#do.iter().map(|t| t.tile_id).collect();

    let result = match parse_rule(&when_ids, &do_ids, &ctx) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("parsed {} top-level expression(s)", result.parse_result.exprs.len());
    for diag in &result.parse_result.diags {
        println!("{diag}");
    }
    for diag in &result.type_diags {
        println!("{diag}");
    }

    if let Some(suggest_idx) = suggest_index(&args) {
        run_suggest(&when_ids, &do_ids, &ctx, suggest_idx);
    }

    ExitCode::SUCCESS
}

fn suggest_index(args: &[String]) -> Option<usize> {
    let pos = args.iter().position(|a| a == "--suggest")?;
    args.get(pos + 1)?.parse().ok()
}

fn run_suggest(when_ids: &[TileId], do_ids: &[TileId], ctx: &Ctx<'_>, idx: usize) {
    let (rule_side, side_tiles, local_idx) = if idx < when_ids.len() {
        (RuleSide::When, when_ids, idx)
    } else {
        (RuleSide::Do, do_ids, idx - when_ids.len())
    };

    let expr = parse_tiles_for_suggestions(side_tiles, ctx);
    let unclosed = mindcraft_core::suggest::count_unclosed_parens(side_tiles, ctx, Some(local_idx));
    let insertion = InsertionContext {
        rule_side,
        expected_type: None,
        expr: Some(&expr),
        replace_tile_index: Some(local_idx),
        available_capabilities: None,
        unclosed_paren_depth: unclosed,
    };

    let suggestions = suggest_tiles(&insertion, ctx);
    println!("-- suggestions at tile {idx} --");
    for s in &suggestions.exact {
        println!("exact: {}", s.tile_def.tile_id);
    }
    for s in &suggestions.with_conversion {
        println!("conversion (cost {}): {}", s.conversion_cost, s.tile_def.tile_id);
    }
}

fn read_rule_file(file_path: &str) -> Result<RuleFile, String> {
    let contents = fs::read_to_string(file_path).map_err(|err| format!("error reading {file_path}: {err}"))?;
    serde_json::from_str(&contents).map_err(|err| format!("error parsing {file_path}: {err}"))
}
