//! Property-based invariants for the plan model, environment and validator.

use gambit_core::env::Environment;
use gambit_core::plan::{is_identifier, Plan, Step};
use gambit_core::validate::{parse_and_validate, validate_plan};
use proptest::prelude::*;

fn identifier() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,8}"
}

/// Strings guaranteed free of brace characters.
fn brace_free() -> impl Strategy<Value = String> {
    "[^{}]{0,64}"
}

proptest! {
    // Rendering is the identity on strings without brace patterns.
    #[test]
    fn render_is_identity_without_braces(s in brace_free()) {
        let env = Environment::new();
        prop_assert_eq!(env.render(&s).text, s);
    }

    // Rendering never reports a ref as both used and missing.
    #[test]
    fn render_used_and_missing_disjoint(
        template in "[a-z{} ]{0,64}",
        name in identifier(),
        value in brace_free(),
    ) {
        let mut env = Environment::new();
        env.seed(name, value);
        let rendered = env.render(&template);
        for used in &rendered.refs_used {
            prop_assert!(!rendered.refs_missing.contains(used));
        }
    }

    // Write-once: a second bind of any name fails, and the first value
    // survives.
    #[test]
    fn environment_is_write_once(
        name in identifier(),
        first in brace_free(),
        second in brace_free(),
    ) {
        let mut env = Environment::new();
        env.bind(name.clone(), first.clone()).unwrap();
        prop_assert!(env.bind(name.clone(), second).is_err());
        prop_assert_eq!(env.lookup(&name), Some(first.as_str()));
    }

    // Seeded variables always render back verbatim (no recursive
    // expansion, no mangling).
    #[test]
    fn seeded_value_round_trips_through_render(
        name in identifier(),
        value in brace_free(),
    ) {
        let mut env = Environment::new();
        env.seed(name.clone(), value.clone());
        let rendered = env.render(&format!("{{{}}}", name));
        prop_assert_eq!(rendered.text, value);
        prop_assert_eq!(rendered.refs_used, vec![name]);
    }
}

/// A generated linear plan: some llm steps with unique ids and outputs,
/// then an end step.
fn linear_plan() -> impl Strategy<Value = Plan> {
    (1usize..6, 1u32..=50).prop_map(|(count, cap)| {
        let mut steps: Vec<Step> = (0..count)
            .map(|i| Step::Llm {
                id: format!("L{}", i),
                description: String::new(),
                prompt: format!("step {} of {{user_query}}", i),
                input_refs: vec!["user_query".to_string()],
                output_name: format!("out_{}", i),
            })
            .collect();
        steps.push(Step::End {
            id: "END".to_string(),
            description: String::new(),
        });
        Plan {
            steps,
            max_iterations: cap,
            reasoning: String::new(),
        }
    })
}

proptest! {
    // Round-trip law: any plan the validator accepts survives
    // JSON serialization unchanged.
    #[test]
    fn accepted_plan_round_trips(plan in linear_plan()) {
        prop_assert!(validate_plan(&plan, &[], &["user_query"]).is_empty());

        let json = serde_json::to_value(&plan).unwrap();
        let back: Plan = serde_json::from_value(json.clone()).unwrap();
        prop_assert_eq!(&back, &plan);

        // The JSON form also re-enters through the diagnostic parser.
        let (reparsed, warnings) =
            parse_and_validate(&json, &[], &["user_query"]).unwrap();
        prop_assert!(warnings.is_empty());
        prop_assert_eq!(reparsed, plan);
    }

    // Every plan the validator accepts has resolvable gotos, unique ids
    // and unique output names.
    #[test]
    fn accepted_plans_satisfy_invariants(plan in linear_plan()) {
        let issues = validate_plan(&plan, &[], &["user_query"]);
        prop_assert!(issues.is_empty());

        let ids: std::collections::HashSet<&str> =
            plan.steps.iter().map(Step::id).collect();
        prop_assert_eq!(ids.len(), plan.steps.len());

        for step in &plan.steps {
            if let Some(target) = step.goto_id() {
                prop_assert!(ids.contains(target));
            }
            for input_ref in step.input_refs() {
                prop_assert!(is_identifier(input_ref));
            }
        }

        let outputs: Vec<&str> =
            plan.steps.iter().filter_map(Step::output_name).collect();
        let unique: std::collections::HashSet<&&str> = outputs.iter().collect();
        prop_assert_eq!(unique.len(), outputs.len());
    }
}
