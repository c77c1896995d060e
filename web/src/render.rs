//! HTML pages served by the survey.

use survey::Question;

/// Points on both rating scales.
pub const SCALE: [(&str, &str); 5] = [
    ("1", "1 (not at all)"),
    ("2", "2"),
    ("3", "3"),
    ("4", "4"),
    ("5", "5 (completely)"),
];

/// Escape text for use in HTML content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>\n\
         body {{ font-family: sans-serif; max-width: 960px; margin: 2em auto; }}\n\
         .pair {{ display: flex; gap: 1em; }}\n\
         .pair figure {{ flex: 1; margin: 0; }}\n\
         .pair img {{ width: 100%; }}\n\
         .error {{ color: #b00; }}\n\
         </style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

fn error_line(error: Option<&str>) -> String {
    error
        .map(|e| format!("<p class=\"error\">{}</p>\n", escape(e)))
        .unwrap_or_default()
}

/// Entry page asking for the respondent's cohort.
pub fn cohort_page(cohorts: &[String], error: Option<&str>) -> String {
    let options: String = cohorts
        .iter()
        .map(|c| {
            let c = escape(c);
            format!("<option value=\"{c}\">{c}</option>\n")
        })
        .collect();
    let body = format!(
        "<h1>Image pair survey</h1>\n{}\
         <form method=\"post\" action=\"/\">\n\
         <label for=\"grade\">Cohort</label>\n\
         <select id=\"grade\" name=\"grade\" required>\n{options}</select>\n\
         <button type=\"submit\">Start</button>\n</form>",
        error_line(error)
    );
    page("Image pair survey", &body)
}

fn scale(name: &str, legend: &str) -> String {
    let choices: String = SCALE
        .iter()
        .map(|(value, label)| {
            format!(
                "<label><input type=\"radio\" name=\"{name}\" value=\"{value}\" required> {}</label>\n",
                escape(label)
            )
        })
        .collect();
    format!("<fieldset>\n<legend>{}</legend>\n{choices}</fieldset>\n", escape(legend))
}

/// Question page showing one pair and both rating scales.
pub fn question_page(question: &Question, error: Option<&str>) -> String {
    let real = urlencoding::encode(&question.real_filename);
    let synth = urlencoding::encode(&question.synth_filename);
    let body = format!(
        "<h1>Question {number} / {total}</h1>\n{error}\
         <div class=\"pair\">\n\
         <figure><img src=\"/real/{real}\" alt=\"real photo {prefix}\"><figcaption>A</figcaption></figure>\n\
         <figure><img src=\"/synth/{synth}\" alt=\"generated image {prefix}\"><figcaption>B</figcaption></figure>\n\
         </div>\n\
         <form method=\"post\" action=\"/survey\">\n{similarity}{weather}\
         <button type=\"submit\">Next</button>\n</form>",
        number = question.number,
        total = question.total,
        error = error_line(error),
        prefix = escape(&question.prefix),
        similarity = scale("similarity", "How similar are the two images?"),
        weather = scale("weather", "How plausible is the weather in image B?"),
    );
    page(&format!("Question {}", question.number), &body)
}

/// Final page once every question has been answered.
pub fn done_page(answered: usize) -> String {
    let body = format!(
        "<h1>Thank you!</h1>\n<p>Your {answered} answers have been recorded.</p>\n\
         <p><a href=\"/\">Start again</a></p>"
    );
    page("Thank you", &body)
}

/// Shown when the finished responses could not be stored.
pub fn save_failed_page() -> String {
    page(
        "Could not save",
        "<h1>Your answers could not be saved</h1>\n\
         <p>Nothing was lost. Please reload this page to try again.</p>",
    )
}
