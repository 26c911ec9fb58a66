use crate::{ledger::MonthStatus, routes::Page};
use maud::{Markup, Render, html};

pub fn render_table<const N: usize>(
    overall_title: impl Render,
    titles: [&'static str; N],
    items: Vec<[Markup; N]>,
) -> Markup {
    html! {
        div class="container mx-auto" {
            (subtitle(overall_title))
            div class="overflow-x-auto" {
                table class="min-w-full bg-gray-800 rounded shadow-md" {
                    thead class="bg-gray-700" {
                        tr {
                            @for title in titles {
                                th class="py-2 px-4 text-left font-semibold text-gray-300" {(title)}
                            }
                        }
                    }
                    tbody {
                        @for row in items {
                            tr {
                                @for col in row {
                                    td class="py-2 px-4 border-b border-gray-600 text-gray-200" {(col)}
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn supertitle(s: impl Render) -> Markup {
    html! {
        h1 class="text-3xl font-bold mb-6 text-center" {(s)}
    }
}

pub fn title(s: impl Render) -> Markup {
    html! {
        h1 class="text-2xl font-semibold mb-4" {(s)}
    }
}

pub fn subtitle(s: impl Render) -> Markup {
    html! {
        h2 class="text-xl font-semibold mb-2 text-gray-200" {(s)}
    }
}

pub fn form_element(id: &'static str, label: &'static str, input: Markup) -> Markup {
    html! {
        div class="mb-4" {
            label for=(id) class="block text-sm font-bold mb-2 text-gray-300" {(label)}
            (input)
        }
    }
}

pub fn simple_form_element(
    id: &'static str,
    label: &'static str,
    required: bool,
    ty: Option<&'static str>,
    value: Option<&str>,
) -> Markup {
    form_element(
        id,
        label,
        html! {
            input type=(ty.unwrap_or("text")) id=(id) name=(id) required[required] value=[value] step=[(ty == Some("number")).then_some("any")] class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600";
        },
    )
}

pub fn form_submit_button(text: Option<&'static str>) -> Markup {
    html! {
        div class="flex items-center justify-between" {
            button type="submit" class="bg-blue-500 hover:bg-blue-700 font-bold py-2 px-4 rounded focus:outline-none focus:shadow-outline" {
                (text.unwrap_or("Submit"))
            }
        }
    }
}

pub fn errors_list(
    heading: Option<&'static str>,
    errors: impl Iterator<Item = impl Render>,
) -> Markup {
    html! {
        div class="bg-red-100 border border-red-400 text-red-700 px-4 py-3 rounded relative mb-4" role="alert" {
            @if let Some(heading) = heading {
                strong class="font-bold" {(heading)}
            }
            ul class="list-disc list-inside" {
                @for error in errors {
                    li {(error)}
                }
            }
        }
    }
}

pub fn success_message(message: impl Render) -> Markup {
    html! {
        div class="bg-green-100 border border-green-400 text-green-800 px-4 py-3 rounded mb-4" role="status" {
            (message)
        }
    }
}

pub fn render_nav(current: &Page) -> Markup {
    html! {
        nav class="bg-gray-800 w-full shadow mb-6" {
            div class="max-w-6xl mx-auto px-4 flex items-center justify-between h-16" {
                a href="/" class="text-xl font-bold text-pink-400" {"Feebook"}
                div class="flex space-x-4" {
                    @for page in Page::NAV {
                        @let classes = if page == *current {
                            "bg-gray-900 text-white px-3 py-2 rounded-md text-sm font-medium"
                        } else {
                            "text-gray-300 hover:bg-gray-700 hover:text-white px-3 py-2 rounded-md text-sm font-medium"
                        };
                        a href=(page.path()) class=(classes) {(page.title())}
                    }
                }
            }
        }
    }
}

pub struct Email<'a>(pub &'a str);

impl Render for Email<'_> {
    fn render(&self) -> Markup {
        html! {
            a href={"mailto:" (self.0)} class="text-blue-400 underline hover:text-blue-300" {(self.0)}
        }
    }
}

/// An amount of money with the configured symbol, grouped in thousands and shown to two places.
pub struct Money<'a> {
    pub amount: f64,
    pub symbol: &'a str,
}

impl Money<'_> {
    fn grouped(&self) -> String {
        let formatted = format!("{:.2}", self.amount.abs());
        let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        let sign = if self.amount < -0.005 { "-" } else { "" };
        format!("{sign}{}{grouped}.{fraction}", self.symbol)
    }
}

impl Render for Money<'_> {
    fn render(&self) -> Markup {
        html! {
            span class="font-mono" {(self.grouped())}
        }
    }
}

pub fn month_status_badge(status: MonthStatus, has_advance: bool) -> Markup {
    let (classes, text) = match status {
        MonthStatus::Paid if has_advance => ("bg-emerald-700", "Paid (Advance)"),
        MonthStatus::Paid => ("bg-green-700", "Paid"),
        MonthStatus::Partial => ("bg-yellow-700", "Partial"),
        MonthStatus::Pending => ("bg-gray-600", "Pending"),
        MonthStatus::Overdue => ("bg-red-700", "Overdue"),
    };
    html! {
        span class={"px-2 py-1 rounded text-xs font-semibold " (classes)} {(text)}
    }
}

pub fn fee_status_badge(fully_paid: bool) -> Markup {
    html! {
        @if fully_paid {
            span class="px-2 py-1 rounded text-xs font-semibold bg-green-700" {"Fees Paid"}
        } @else {
            span class="px-2 py-1 rounded text-xs font-semibold bg-yellow-700" {"Fees Pending"}
        }
    }
}

pub fn progress_bar(percentage: f64) -> Markup {
    let clamped = percentage.clamp(0.0, 100.0);
    html! {
        div class="w-full bg-gray-700 rounded h-2" {
            div class="bg-green-500 h-2 rounded" style={"width: " (format!("{clamped:.1}")) "%"} {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(amount: f64) -> String {
        Money {
            amount,
            symbol: "₹",
        }
        .grouped()
    }

    #[test]
    fn money_is_grouped_in_thousands() {
        assert_eq!(money(0.0), "₹0.00");
        assert_eq!(money(999.999), "₹1,000.00");
        assert_eq!(money(1234567.5), "₹1,234,567.50");
        assert_eq!(money(333.333_333), "₹333.33");
        assert_eq!(money(-1500.0), "-₹1,500.00");
    }

    #[test]
    fn nav_marks_the_current_page() {
        let nav = render_nav(&Page::ListView).into_string();
        assert!(nav.contains(r#"href="/students" class="bg-gray-900"#));
        assert!(!nav.contains(r#"href="/" class="bg-gray-900"#));
    }
}
