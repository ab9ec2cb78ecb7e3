//! Builders for host trees used across the integration tests.
#![allow(dead_code)]

use sql_flow_analyzer::{
    analyzer::Analyzer,
    config::Config,
    diagnostic::{Category, Diagnostic},
    host::{ArrayItem, Expr, Location, Method, SourceFile, Stmt, Target, TypeAlias, TypeDecl}
};

pub fn loc(line: u32) -> Location {
    Location::new(line, 9)
}

pub fn string(value: &str, line: u32) -> Expr {
    Expr::Str {
        value:    value.to_string(),
        location: loc(line)
    }
}

pub fn local(name: &str, line: u32) -> Expr {
    Expr::Local {
        name:     name.to_string(),
        location: loc(line)
    }
}

pub fn field(name: &str, line: u32) -> Expr {
    Expr::Field {
        name:     name.to_string(),
        location: loc(line)
    }
}

pub fn call(receiver: Expr, method: &str, args: Vec<Expr>, line: u32) -> Expr {
    Expr::Call {
        receiver: Some(Box::new(receiver)),
        method: method.to_string(),
        args,
        location: loc(line)
    }
}

/// `['a' => 1, 'b' => 2]`, each key on its own line.
pub fn params(keys: &[(&str, u32)]) -> Expr {
    let line = keys.first().map_or(1, |(_, line)| *line);
    Expr::Array {
        items:    keys
            .iter()
            .map(|(key, line)| ArrayItem {
                key:      Some(string(key, *line)),
                value:    Expr::Int {
                    value:    1,
                    location: loc(*line)
                },
                location: loc(*line)
            })
            .collect(),
        location: loc(line)
    }
}

/// `$target = $pdo->prepare(<arg>);`
pub fn prepare_expr(target: Target, arg: Expr, line: u32) -> Stmt {
    Stmt::Assign {
        target,
        value: call(local("pdo", line), "prepare", vec![arg], line),
        annotation: None,
        location: loc(line)
    }
}

/// `$target = $pdo->prepare('<sql>');`
pub fn prepare(target: Target, sql: &str, line: u32) -> Stmt {
    prepare_expr(target, string(sql, line), line)
}

/// `$name = <value>;`
pub fn assign_local(name: &str, value: Expr, line: u32) -> Stmt {
    Stmt::Assign {
        target: Target::Local(name.to_string()),
        value,
        annotation: None,
        location: loc(line)
    }
}

pub fn stmt(name: &str) -> Target {
    Target::Local(name.to_string())
}

pub fn receiver(target: &Target, line: u32) -> Expr {
    match target {
        Target::Local(name) => local(name, line),
        Target::Field(name) => field(name, line)
    }
}

/// `<target>->execute(<args>);`
pub fn execute(target: &Target, args: Vec<Expr>, line: u32) -> Stmt {
    Stmt::Expr {
        expr:       call(receiver(target, line), "execute", args, line),
        annotation: None,
        location:   loc(line)
    }
}

/// `<target>->bindValue('<name>', 1);`
pub fn bind_value(target: &Target, name: &str, line: u32) -> Stmt {
    Stmt::Expr {
        expr:       call(
            receiver(target, line),
            "bindValue",
            vec![string(name, line), Expr::Int {
                value:    1,
                location: loc(line)
            }],
            line
        ),
        annotation: None,
        location:   loc(line)
    }
}

/// `/** @var <annotation> */ $var = <target>-><method>();`
pub fn fetch_into(var: &str, target: &Target, method: &str, annotation: Option<&str>, line: u32) -> Stmt {
    Stmt::Assign {
        target:     Target::Local(var.to_string()),
        value:      call(receiver(target, line), method, vec![], line),
        annotation: annotation.map(str::to_string),
        location:   loc(line)
    }
}

pub fn method(name: &str, body: Vec<Stmt>) -> Method {
    Method {
        name: name.to_string(),
        body,
        location: loc(1)
    }
}

/// A file holding free-standing functions only.
pub fn functions_file(functions: Vec<Method>) -> SourceFile {
    SourceFile {
        path: "app.php".to_string(),
        types: vec![],
        functions
    }
}

/// A file holding one type.
pub fn type_file(name: &str, aliases: Vec<TypeAlias>, methods: Vec<Method>) -> SourceFile {
    SourceFile {
        path:      "app.php".to_string(),
        types:     vec![TypeDecl {
            name: name.to_string(),
            aliases,
            methods,
            location: loc(1)
        }],
        functions: vec![]
    }
}

pub fn analyze(files: &[SourceFile]) -> Vec<Diagnostic> {
    analyze_with(&Config::default(), files)
}

pub fn analyze_with(config: &Config, files: &[SourceFile]) -> Vec<Diagnostic> {
    Analyzer::new(config)
        .analyze(files)
        .diagnostics()
        .cloned()
        .collect()
}

pub fn categories(diagnostics: &[Diagnostic]) -> Vec<Category> {
    diagnostics.iter().map(|d| d.category).collect()
}
