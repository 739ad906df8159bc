//! # Source Extractor
//!
//! @title Scope-Aware Exposure Extraction
//! @author Ramprasad
//!
//! Walks the parsed module in one pass, maintaining a stack of enclosing
//! function names so that calls inside nested definitions are attributed
//! to their true innermost function. The walk populates the exposure
//! graph, the function map, the entry point list, and the
//! discovery-ordered sink list in a single traversal.

use line_numbers::LinePositions;
use rustpython_parser::ast::{self, ExceptHandler, Expr, Stmt};

use crate::analysis::graph::{self, ExposureGraph, GraphNode, ORIGIN_ID};
use crate::config::AnalysisConfig;

use super::{DangerousCall, EntryPoint, FunctionInfo, FunctionMap, ParsedProgram, Visibility};

/// Everything the extractor derives from one submission.
#[derive(Debug)]
pub struct Extraction {
    /// Exposure graph with the origin node pre-inserted.
    pub graph: ExposureGraph,

    /// Per-function facts in definition order.
    pub functions: FunctionMap,

    /// Route-decorated handlers in discovery order.
    pub entry_points: Vec<EntryPoint>,

    /// Every dangerous call site in discovery order.
    pub dangerous_calls: Vec<DangerousCall>,

    /// Unique sink node identifiers in first-discovery order.
    pub sink_order: Vec<String>,
}

/// Runs the extraction pass over a parsed submission.
///
/// # Arguments
///
/// * `config` - Analysis policy with sink names, route verbs, and prefixes
/// * `program` - The parsed submission
///
/// # Returns
///
/// The populated [`Extraction`].
pub fn extract(config: &AnalysisConfig, program: &ParsedProgram) -> Extraction {
    let mut extractor = SourceExtractor::new(config, &program.source);
    for stmt in &program.body {
        extractor.walk_stmt(stmt);
    }
    extractor.finish()
}

/// Single-pass AST walker carrying the scope stack.
struct SourceExtractor<'a> {
    config: &'a AnalysisConfig,
    lines: LinePositions,
    graph: ExposureGraph,
    functions: FunctionMap,
    entry_points: Vec<EntryPoint>,
    dangerous_calls: Vec<DangerousCall>,
    sink_order: Vec<String>,
    scope: Vec<String>,
}

impl<'a> SourceExtractor<'a> {
    fn new(config: &'a AnalysisConfig, source: &str) -> Self {
        let mut graph = ExposureGraph::new();
        graph.add_node(GraphNode::origin());

        Self {
            config,
            lines: LinePositions::from(source),
            graph,
            functions: FunctionMap::default(),
            entry_points: Vec::new(),
            dangerous_calls: Vec::new(),
            sink_order: Vec::new(),
            scope: Vec::new(),
        }
    }

    fn finish(self) -> Extraction {
        Extraction {
            graph: self.graph,
            functions: self.functions,
            entry_points: self.entry_points,
            dangerous_calls: self.dangerous_calls,
            sink_order: self.sink_order,
        }
    }

    /// Converts a byte offset into a 1-based line number.
    fn line_of(&self, offset: usize) -> usize {
        self.lines.from_offset(offset).as_usize() + 1
    }

    /// Handles one function definition, sync or async.
    ///
    /// Records the function node, scans its decorators for routes, then
    /// walks the definition with the function pushed on the scope stack
    /// so nested calls are attributed to it.
    fn enter_function(
        &mut self,
        name: &str,
        decorator_list: &[Expr],
        returns: Option<&Expr>,
        body: &[Stmt],
        line: usize,
    ) {
        self.graph.add_node(GraphNode::function(name));
        self.functions
            .entry(name.to_string())
            .or_insert_with(|| FunctionInfo::new(name, line));

        for decorator in decorator_list {
            if let Some((verb, route_path)) = self.match_route(decorator) {
                self.record_entry(name, verb, route_path, line);
            }
        }

        self.scope.push(name.to_string());
        for stmt in body {
            self.walk_stmt(stmt);
        }
        for decorator in decorator_list {
            self.walk_expr(decorator);
        }
        if let Some(annotation) = returns {
            self.walk_expr(annotation);
        }
        self.scope.pop();
    }

    /// Records a matched route decorator as an entry point.
    ///
    /// Public entries get an edge from the origin; internal entries stay
    /// disconnected from it. The first matching decorator decides the
    /// route facts stored on the function.
    fn record_entry(&mut self, function: &str, verb: String, route_path: String, line: usize) {
        let visibility = Visibility::classify(&route_path, &self.config.internal_prefixes);
        let route_node = graph::entry_id(&route_path);

        self.graph.add_node(GraphNode::entry(&route_path));
        self.graph.add_edge(&route_node, function);
        if visibility == Visibility::Public {
            self.graph.add_edge(ORIGIN_ID, &route_node);
        }

        if let Some(info) = self.functions.get_mut(function) {
            info.is_entry = true;
            if info.route_path.is_none() {
                info.route_path = Some(route_path.clone());
                info.visibility = Some(visibility);
            }
        }

        self.entry_points.push(EntryPoint {
            function: function.to_string(),
            route_path,
            verb,
            visibility,
            line,
        });
    }

    /// Matches a decorator of the form `app.<verb>("<path>")`.
    ///
    /// The verb must be one of the configured route verbs and the first
    /// positional argument must be a string literal; anything else is not
    /// a route.
    fn match_route(&self, decorator: &Expr) -> Option<(String, String)> {
        let Expr::Call(call) = decorator else {
            return None;
        };
        let Expr::Attribute(attr) = call.func.as_ref() else {
            return None;
        };
        let verb = attr.attr.as_str();
        if !self.config.route_verbs.iter().any(|v| v == verb) {
            return None;
        }
        let Expr::Constant(constant) = call.args.first()? else {
            return None;
        };
        let ast::Constant::Str(route_path) = &constant.value else {
            return None;
        };
        Some((verb.to_string(), route_path.clone()))
    }

    /// Records one call expression.
    ///
    /// Resolved names feed the enclosing function's call list; names on
    /// the sink list additionally insert a sink node and an edge from the
    /// innermost enclosing function. Module-level sinks get a node but no
    /// incoming edge.
    fn record_call(&mut self, call: &ast::ExprCall) {
        let Some(name) = resolve_call_name(&call.func) else {
            return;
        };

        if let Some(current) = self.scope.last() {
            if let Some(info) = self.functions.get_mut(current) {
                info.called_names.push(name.clone());
            }
        }

        if !self.config.sink_names.iter().any(|sink| sink == &name) {
            return;
        }

        let line = self.line_of(call.range.start().into());
        self.dangerous_calls.push(DangerousCall {
            caller: self.scope.last().cloned(),
            callee: name.clone(),
            line,
        });

        let sink_node = graph::sink_id(&name);
        if self.graph.add_node(GraphNode::sink(&name)) {
            self.sink_order.push(sink_node.clone());
        }
        if let Some(caller) = self.scope.last().cloned() {
            self.graph.add_edge(&caller, &sink_node);
        }
    }

    fn walk_suite(&mut self, suite: &[Stmt]) {
        for stmt in suite {
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(func) => {
                let line = self.line_of(func.range.start().into());
                self.enter_function(
                    func.name.as_str(),
                    &func.decorator_list,
                    func.returns.as_deref(),
                    &func.body,
                    line,
                );
            }
            Stmt::AsyncFunctionDef(func) => {
                let line = self.line_of(func.range.start().into());
                self.enter_function(
                    func.name.as_str(),
                    &func.decorator_list,
                    func.returns.as_deref(),
                    &func.body,
                    line,
                );
            }
            Stmt::ClassDef(class) => {
                for decorator in &class.decorator_list {
                    self.walk_expr(decorator);
                }
                for base in &class.bases {
                    self.walk_expr(base);
                }
                for keyword in &class.keywords {
                    self.walk_expr(&keyword.value);
                }
                self.walk_suite(&class.body);
            }
            Stmt::Expr(expr_stmt) => {
                self.walk_expr(&expr_stmt.value);
            }
            Stmt::Assign(assign) => {
                self.walk_expr(&assign.value);
                for target in &assign.targets {
                    self.walk_expr(target);
                }
            }
            Stmt::AugAssign(aug) => {
                self.walk_expr(&aug.target);
                self.walk_expr(&aug.value);
            }
            Stmt::AnnAssign(ann) => {
                self.walk_expr(&ann.annotation);
                if let Some(value) = &ann.value {
                    self.walk_expr(value);
                }
            }
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.walk_expr(value);
                }
            }
            Stmt::Delete(del) => {
                for target in &del.targets {
                    self.walk_expr(target);
                }
            }
            Stmt::Raise(raise) => {
                if let Some(exc) = &raise.exc {
                    self.walk_expr(exc);
                }
                if let Some(cause) = &raise.cause {
                    self.walk_expr(cause);
                }
            }
            Stmt::Assert(assert) => {
                self.walk_expr(&assert.test);
                if let Some(msg) = &assert.msg {
                    self.walk_expr(msg);
                }
            }
            Stmt::If(if_stmt) => {
                self.walk_expr(&if_stmt.test);
                self.walk_suite(&if_stmt.body);
                self.walk_suite(&if_stmt.orelse);
            }
            Stmt::For(for_stmt) => {
                self.walk_expr(&for_stmt.target);
                self.walk_expr(&for_stmt.iter);
                self.walk_suite(&for_stmt.body);
                self.walk_suite(&for_stmt.orelse);
            }
            Stmt::AsyncFor(for_stmt) => {
                self.walk_expr(&for_stmt.target);
                self.walk_expr(&for_stmt.iter);
                self.walk_suite(&for_stmt.body);
                self.walk_suite(&for_stmt.orelse);
            }
            Stmt::While(while_stmt) => {
                self.walk_expr(&while_stmt.test);
                self.walk_suite(&while_stmt.body);
                self.walk_suite(&while_stmt.orelse);
            }
            Stmt::With(with_stmt) => {
                for item in &with_stmt.items {
                    self.walk_expr(&item.context_expr);
                    if let Some(vars) = &item.optional_vars {
                        self.walk_expr(vars);
                    }
                }
                self.walk_suite(&with_stmt.body);
            }
            Stmt::AsyncWith(with_stmt) => {
                for item in &with_stmt.items {
                    self.walk_expr(&item.context_expr);
                    if let Some(vars) = &item.optional_vars {
                        self.walk_expr(vars);
                    }
                }
                self.walk_suite(&with_stmt.body);
            }
            Stmt::Try(try_stmt) => {
                self.walk_suite(&try_stmt.body);
                for handler in &try_stmt.handlers {
                    let ExceptHandler::ExceptHandler(handler) = handler;
                    if let Some(exception_type) = &handler.type_ {
                        self.walk_expr(exception_type);
                    }
                    self.walk_suite(&handler.body);
                }
                self.walk_suite(&try_stmt.orelse);
                self.walk_suite(&try_stmt.finalbody);
            }
            Stmt::TryStar(try_stmt) => {
                self.walk_suite(&try_stmt.body);
                for handler in &try_stmt.handlers {
                    let ExceptHandler::ExceptHandler(handler) = handler;
                    if let Some(exception_type) = &handler.type_ {
                        self.walk_expr(exception_type);
                    }
                    self.walk_suite(&handler.body);
                }
                self.walk_suite(&try_stmt.orelse);
                self.walk_suite(&try_stmt.finalbody);
            }
            Stmt::Match(match_stmt) => {
                self.walk_expr(&match_stmt.subject);
                for case in &match_stmt.cases {
                    if let Some(guard) = &case.guard {
                        self.walk_expr(guard);
                    }
                    self.walk_suite(&case.body);
                }
            }
            _ => {}
        }
    }

    fn walk_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Call(call) => {
                self.record_call(call);
                self.walk_expr(&call.func);
                for arg in &call.args {
                    self.walk_expr(arg);
                }
                for keyword in &call.keywords {
                    self.walk_expr(&keyword.value);
                }
            }
            Expr::Attribute(attr) => {
                self.walk_expr(&attr.value);
            }
            Expr::BinOp(binop) => {
                self.walk_expr(&binop.left);
                self.walk_expr(&binop.right);
            }
            Expr::UnaryOp(unary) => {
                self.walk_expr(&unary.operand);
            }
            Expr::BoolOp(boolop) => {
                for value in &boolop.values {
                    self.walk_expr(value);
                }
            }
            Expr::Compare(compare) => {
                self.walk_expr(&compare.left);
                for comparator in &compare.comparators {
                    self.walk_expr(comparator);
                }
            }
            Expr::IfExp(ifexp) => {
                self.walk_expr(&ifexp.test);
                self.walk_expr(&ifexp.body);
                self.walk_expr(&ifexp.orelse);
            }
            Expr::NamedExpr(named) => {
                self.walk_expr(&named.value);
            }
            Expr::Lambda(lambda) => {
                self.walk_expr(&lambda.body);
            }
            Expr::Dict(dict) => {
                for key in dict.keys.iter().flatten() {
                    self.walk_expr(key);
                }
                for value in &dict.values {
                    self.walk_expr(value);
                }
            }
            Expr::Set(set) => {
                for elt in &set.elts {
                    self.walk_expr(elt);
                }
            }
            Expr::List(list) => {
                for elt in &list.elts {
                    self.walk_expr(elt);
                }
            }
            Expr::Tuple(tuple) => {
                for elt in &tuple.elts {
                    self.walk_expr(elt);
                }
            }
            Expr::ListComp(comp) => {
                self.walk_expr(&comp.elt);
                self.walk_generators(&comp.generators);
            }
            Expr::SetComp(comp) => {
                self.walk_expr(&comp.elt);
                self.walk_generators(&comp.generators);
            }
            Expr::DictComp(comp) => {
                self.walk_expr(&comp.key);
                self.walk_expr(&comp.value);
                self.walk_generators(&comp.generators);
            }
            Expr::GeneratorExp(gen) => {
                self.walk_expr(&gen.elt);
                self.walk_generators(&gen.generators);
            }
            Expr::Subscript(subscript) => {
                self.walk_expr(&subscript.value);
                self.walk_expr(&subscript.slice);
            }
            Expr::Starred(starred) => {
                self.walk_expr(&starred.value);
            }
            Expr::Slice(slice) => {
                if let Some(lower) = &slice.lower {
                    self.walk_expr(lower);
                }
                if let Some(upper) = &slice.upper {
                    self.walk_expr(upper);
                }
                if let Some(step) = &slice.step {
                    self.walk_expr(step);
                }
            }
            Expr::Await(await_expr) => {
                self.walk_expr(&await_expr.value);
            }
            Expr::Yield(yield_expr) => {
                if let Some(value) = &yield_expr.value {
                    self.walk_expr(value);
                }
            }
            Expr::YieldFrom(yield_from) => {
                self.walk_expr(&yield_from.value);
            }
            Expr::FormattedValue(formatted) => {
                self.walk_expr(&formatted.value);
            }
            Expr::JoinedStr(joined) => {
                for value in &joined.values {
                    self.walk_expr(value);
                }
            }
            _ => {}
        }
    }

    fn walk_generators(&mut self, generators: &[ast::Comprehension]) {
        for generator in generators {
            self.walk_expr(&generator.iter);
            for if_clause in &generator.ifs {
                self.walk_expr(if_clause);
            }
        }
    }
}

/// Resolves a call target to a bare or dotted name.
///
/// `eval(...)` resolves to `eval`; `os.system(...)` resolves to
/// `os.system`. Deeper attribute chains and computed targets stay
/// unresolved.
fn resolve_call_name(func: &Expr) -> Option<String> {
    match func {
        Expr::Name(name) => Some(name.id.to_string()),
        Expr::Attribute(attr) => match attr.value.as_ref() {
            Expr::Name(base) => Some(format!("{}.{}", base.id, attr.attr)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::graph::NodeKind;

    fn extract_source(source: &str) -> Extraction {
        let config = AnalysisConfig::default();
        let program = ParsedProgram::from_source(source).unwrap();
        extract(&config, &program)
    }

    #[test]
    fn test_public_route_builds_kill_chain() {
        let extraction = extract_source(
            r#"
import subprocess
from fastapi import FastAPI

app = FastAPI()

@app.get("/deploy")
def deploy_service(cmd: str):
    subprocess.call(cmd, shell=True)
    return {"status": "deployed"}
"#,
        );

        assert!(extraction.graph.contains_node(ORIGIN_ID));
        assert!(extraction.graph.contains_node("ROUTE: /deploy"));
        assert!(extraction.graph.contains_node("deploy_service"));
        assert!(extraction.graph.contains_node("VULN: subprocess.call"));

        assert_eq!(extraction.graph.outgoing(ORIGIN_ID), ["ROUTE: /deploy".to_string()]);
        assert_eq!(
            extraction.graph.outgoing("ROUTE: /deploy"),
            ["deploy_service".to_string()]
        );
        assert!(extraction
            .graph
            .outgoing("deploy_service")
            .contains(&"VULN: subprocess.call".to_string()));

        assert_eq!(extraction.entry_points.len(), 1);
        let entry = &extraction.entry_points[0];
        assert_eq!(entry.function, "deploy_service");
        assert_eq!(entry.route_path, "/deploy");
        assert_eq!(entry.verb, "get");
        assert_eq!(entry.visibility, Visibility::Public);

        assert_eq!(extraction.sink_order, ["VULN: subprocess.call"]);
        assert_eq!(
            extraction.dangerous_calls[0].caller.as_deref(),
            Some("deploy_service")
        );
    }

    #[test]
    fn test_internal_route_has_no_origin_edge() {
        let extraction = extract_source(
            r#"
import os
from fastapi import FastAPI

app = FastAPI()

@app.get("/internal/cleanup")
def cleanup_workspace():
    os.system("rm -rf /tmp/workspace")
    return {"status": "clean"}
"#,
        );

        assert!(extraction.graph.contains_node("ROUTE: /internal/cleanup"));
        assert!(extraction.graph.outgoing(ORIGIN_ID).is_empty());
        assert_eq!(extraction.entry_points[0].visibility, Visibility::Internal);
        assert_eq!(extraction.sink_order, ["VULN: os.system"]);
    }

    #[test]
    fn test_unrouted_function_is_disconnected_from_origin() {
        let extraction = extract_source(
            "def helper(payload):\n    return eval(payload)\n",
        );

        assert!(extraction.entry_points.is_empty());
        assert!(extraction.graph.outgoing(ORIGIN_ID).is_empty());
        assert!(extraction
            .graph
            .outgoing("helper")
            .contains(&"VULN: eval".to_string()));
    }

    #[test]
    fn test_module_level_sink_has_no_caller() {
        let extraction = extract_source("import os\nos.system(\"uptime\")\n");

        assert_eq!(extraction.dangerous_calls.len(), 1);
        assert!(extraction.dangerous_calls[0].caller.is_none());
        assert!(extraction.graph.contains_node("VULN: os.system"));

        let export = extraction.graph.export();
        assert!(export.edges.iter().all(|e| e.target != "VULN: os.system"));
    }

    #[test]
    fn test_duplicate_sink_discovery_is_idempotent() {
        let extraction = extract_source(
            r#"
import os

def first():
    os.system("a")

def second():
    os.system("b")
"#,
        );

        assert_eq!(extraction.sink_order, ["VULN: os.system"]);
        assert_eq!(extraction.dangerous_calls.len(), 2);
        assert!(extraction
            .graph
            .outgoing("first")
            .contains(&"VULN: os.system".to_string()));
        assert!(extraction
            .graph
            .outgoing("second")
            .contains(&"VULN: os.system".to_string()));
    }

    #[test]
    fn test_nested_definitions_restore_enclosing_scope() {
        let extraction = extract_source(
            r#"
import os

def outer():
    def inner():
        os.system("nested")
    inner()
    eval("after")
"#,
        );

        let nested = extraction
            .dangerous_calls
            .iter()
            .find(|c| c.callee == "os.system")
            .unwrap();
        assert_eq!(nested.caller.as_deref(), Some("inner"));

        let after = extraction
            .dangerous_calls
            .iter()
            .find(|c| c.callee == "eval")
            .unwrap();
        assert_eq!(after.caller.as_deref(), Some("outer"));

        let outer = &extraction.functions["outer"];
        assert!(outer.called_names.contains(&"inner".to_string()));
        assert!(outer.called_names.contains(&"eval".to_string()));
        assert!(!outer.called_names.contains(&"os.system".to_string()));
    }

    #[test]
    fn test_async_handler_is_extracted() {
        let extraction = extract_source(
            r#"
import subprocess
from fastapi import FastAPI

app = FastAPI()

@app.post("/hook")
async def receive_hook(payload: str):
    subprocess.run(payload, shell=True)
"#,
        );

        assert_eq!(extraction.entry_points.len(), 1);
        assert_eq!(extraction.entry_points[0].verb, "post");
        assert_eq!(
            extraction.graph.outgoing("ROUTE: /hook"),
            ["receive_hook".to_string()]
        );
        assert_eq!(extraction.sink_order, ["VULN: subprocess.run"]);
    }

    #[test]
    fn test_route_with_non_literal_path_is_ignored() {
        let extraction = extract_source(
            r#"
PATH = "/deploy"

@app.get(PATH)
def deploy():
    pass
"#,
        );

        assert!(extraction.entry_points.is_empty());
        assert!(extraction.functions.contains_key("deploy"));
    }

    #[test]
    fn test_non_route_decorator_is_not_an_entry() {
        let extraction = extract_source(
            r#"
import functools

@functools.lru_cache()
def cached():
    return 1
"#,
        );

        assert!(extraction.entry_points.is_empty());
        let cached = &extraction.functions["cached"];
        assert!(cached
            .called_names
            .contains(&"functools.lru_cache".to_string()));
    }

    #[test]
    fn test_multiple_routes_keep_first_route_facts() {
        let extraction = extract_source(
            r#"
@app.get("/status")
@app.post("/internal/status")
def status():
    return "ok"
"#,
        );

        assert_eq!(extraction.entry_points.len(), 2);
        let info = &extraction.functions["status"];
        assert_eq!(info.route_path.as_deref(), Some("/status"));
        assert_eq!(info.visibility, Some(Visibility::Public));
    }

    #[test]
    fn test_line_numbers_are_one_based() {
        let extraction = extract_source("import os\n\n\ndef run():\n    os.system(\"x\")\n");

        assert_eq!(extraction.functions["run"].line, 4);
        assert_eq!(extraction.dangerous_calls[0].line, 5);
    }

    #[test]
    fn test_calls_inside_nested_expressions_are_found() {
        let extraction = extract_source(
            r#"
def sweep(items):
    try:
        return [eval(item) for item in items if item]
    except ValueError:
        pass
"#,
        );

        assert_eq!(extraction.dangerous_calls.len(), 1);
        assert_eq!(extraction.dangerous_calls[0].caller.as_deref(), Some("sweep"));
        assert_eq!(extraction.sink_order, ["VULN: eval"]);
    }

    #[test]
    fn test_origin_node_present_for_clean_code() {
        let extraction = extract_source("def quiet():\n    return 1\n");

        assert!(extraction.sink_order.is_empty());
        let origin = extraction.graph.node(ORIGIN_ID).unwrap();
        assert_eq!(origin.kind, NodeKind::Origin);
    }
}
