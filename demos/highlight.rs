use typline::bidi::inject_isolates;
use typline::utils::get_line_and_column;
use typline::{CodeModel, Document};

fn main() {
    let source = r#"// katvan: indent-width 2; replace-tabs on
= Greetings <top>

Hello _world_, see @top and $x^2 + 1$.
#let f(x) = {
  x * 2
}
שלום #f(3) עולם
"#;

    let doc = Document::new(source);

    for (index, analysis) in doc.analyses().enumerate() {
        let line = doc.line(index).unwrap_or_default();
        for marker in &analysis.markers {
            let text = &line[marker.start..marker.end()];
            println!("{:>3}:{:<3} {:?} {text:?}", index + 1, marker.start, marker.kind);
        }
        if !analysis.isolates.is_empty() {
            let isolated = inject_isolates(line, &analysis.isolates);
            println!("    isolated: {:?}", isolated.text);
        }
    }

    let model = CodeModel::new(&doc);
    if let Some(open) = source.find('{') {
        let (line, column) = get_line_and_column(source, open);
        match model.find_matching_bracket(open) {
            Some(close) => {
                let (close_line, close_column) = get_line_and_column(source, close);
                println!("brace at {line}:{column} closes at {close_line}:{close_column}");
            }
            None => println!("brace at {line}:{column} is unmatched"),
        }
    }

    let settings = doc.mode_lines();
    println!("mode line: {}", settings.to_mode_line());

    match doc.analysis(1).map(|a| a.to_json()) {
        Some(Ok(json)) => println!("heading line as JSON:\n{json}"),
        Some(Err(e)) => eprintln!("Failed to serialize: {e:?}"),
        None => {}
    }
}
