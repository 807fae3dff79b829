#![no_main]

use ferrous_scope::{Dependency, ExportStrategy, InjectionScope, Locator};
use libfuzzer_sys::fuzz_target;

struct Leaf(u8);
struct Branch;
struct Loop;

// Each byte is one operation against a small scope tree. Locates must
// return a value or an error and never panic.
fuzz_target!(|data: &[u8]| {
    let root = InjectionScope::new();
    let mut scopes = vec![root.create_child_scope()];

    for &byte in data.iter().take(256) {
        let target = &scopes[byte as usize % scopes.len()];
        match byte >> 4 {
            0 => target.register(ExportStrategy::instance(Leaf(byte)).priority((byte % 3) as i32).build()),
            1 => target.register(
                ExportStrategy::construct(|args| {
                    args.get::<Leaf>(0)?;
                    Ok(Branch)
                })
                .depends_on(Dependency::on::<Leaf>())
                .lifestyle_kind(match byte % 4 {
                    0 => ferrous_scope::LifestyleKind::Singleton,
                    1 => ferrous_scope::LifestyleKind::PerScope,
                    2 => ferrous_scope::LifestyleKind::WeakSingleton,
                    _ => ferrous_scope::LifestyleKind::Transient,
                })
                .build(),
            ),
            2 => target.register(
                ExportStrategy::construct(|args| {
                    args.get::<Loop>(0)?;
                    Ok(Loop)
                })
                .depends_on(Dependency::on::<Loop>())
                .build(),
            ),
            3 | 4 => {
                let _ = target.locate::<Leaf>();
            }
            5 | 6 => {
                let _ = target.locate::<Branch>();
            }
            7 => {
                if target.locate::<Loop>().is_ok() {
                    panic!("a self-dependent export activated");
                }
            }
            8 => {
                let _ = target.locate_all::<Leaf>();
            }
            9 | 10 if scopes.len() < 16 => {
                let child = target.create_child_scope();
                scopes.push(child);
            }
            11 => {
                let _ = target.dispose();
            }
            12 => {
                let _ = target.validate();
            }
            _ => {
                let _ = target.locate_producer::<(u8,), Leaf>();
            }
        }
    }

    let _ = root.dispose();
});
