use anyhow::Result;

/// A repository offered as a one-click starting point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExampleRepository {
    pub name: &'static str,
    pub url: &'static str,
}

pub const EXAMPLE_REPOSITORIES: &[ExampleRepository] = &[
    ExampleRepository {
        name: "Gitingest",
        url: "https://github.com/cyclotruc/gitingest",
    },
    ExampleRepository {
        name: "FastAPI",
        url: "https://github.com/tiangolo/fastapi",
    },
    ExampleRepository {
        name: "Flask",
        url: "https://github.com/pallets/flask",
    },
    ExampleRepository {
        name: "Excalidraw",
        url: "https://github.com/excalidraw/excalidraw",
    },
    ExampleRepository {
        name: "ApiAnalytics",
        url: "https://github.com/tom-draper/api-analytics",
    },
];

/// Look up an example by 1-based number or case-insensitive name.
pub fn find_example(key: &str) -> Option<&'static ExampleRepository> {
    let key = key.trim();
    if let Ok(n) = key.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| EXAMPLE_REPOSITORIES.get(i));
    }
    EXAMPLE_REPOSITORIES
        .iter()
        .find(|example| example.name.eq_ignore_ascii_case(key))
}

pub fn print_examples() {
    println!("Try these example repositories:");
    for (i, example) in EXAMPLE_REPOSITORIES.iter().enumerate() {
        println!("  {}. {:<14} {}", i + 1, example.name, example.url);
    }
}

pub async fn run_examples() -> Result<()> {
    print_examples();
    Ok(())
}
