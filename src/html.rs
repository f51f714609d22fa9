use maud::{DOCTYPE, Markup, PreEscaped, html};
use num_format::{Locale, ToFormattedString};

// Link styles
pub const LINK_STYLE: &str = "text-blue-600 hover:text-blue-500 \
    dark:text-blue-500 dark:hover:text-blue-400 underline";

// Button styles
pub const BUTTON_PRIMARY_STYLE: &str = "w-full px-4 py-2 bg-blue-500
    dark:bg-blue-600 disabled:bg-blue-700 hover:enabled:bg-blue-600 \
    hover:enabled:dark:bg-blue-700 text-white rounded";

pub const BUTTON_SECONDARY_STYLE: &str = "py-2 px-4 text-sm font-medium \
    text-gray-900 bg-white rounded border border-gray-200 hover:bg-gray-100 \
    hover:text-blue-700 dark:bg-gray-800 dark:text-gray-400 \
    dark:border-gray-600 dark:hover:text-white dark:hover:bg-gray-700";

pub const BUTTON_DELETE_STYLE: &str = "text-red-600 hover:text-red-500 \
    dark:text-red-500 dark:hover:text-red-400 underline bg-transparent \
    border-none cursor-pointer";

// Form styles
pub const FORM_CONTAINER_STYLE: &str = "flex flex-col items-center px-6 py-8 \
    mx-auto lg:py-0 max-w-md text-gray-900 dark:text-white";
pub const FORM_LABEL_STYLE: &str = "block mb-2 text-sm font-medium text-gray-900 dark:text-white";
pub const FORM_TEXT_INPUT_STYLE: &str = "block w-full p-2.5 rounded text-sm \
    text-gray-900 dark:text-white disabled:text-gray-500 bg-gray-50 \
    dark:bg-gray-700 border border-gray-300 dark:border-gray-600 \
    dark:placeholder-gray-400 focus:ring-blue-600 focus:border-blue-600 \
    focus:dark:border-blue-500 focus:dark:ring-blue-500";

// Card styles
pub const CARD_STYLE: &str = "w-full bg-white dark:bg-gray-800 border \
    border-gray-200 dark:border-gray-700 rounded-lg p-4 shadow-md";

// Page container
pub const PAGE_CONTAINER_STYLE: &str = "flex flex-col items-center gap-6 px-2 lg:px-6 \
    py-4 lg:py-8 mx-auto max-w-screen-xl text-gray-900 dark:text-white";

pub enum HeadElement {
    /// The file path or URL to a JavaScript script.
    ScriptLink(String),
    /// JavaScript source code.
    #[allow(dead_code)]
    ScriptSource(PreEscaped<String>),
}

pub fn base(title: &str, head_elements: &[HeadElement], content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en"
        {
            head
            {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " - Finance Tracker" }

                script src="https://cdn.tailwindcss.com" {}
                script src="https://unpkg.com/htmx.org@2.0.8/dist/htmx.min.js" {}
                script src="https://unpkg.com/htmx-ext-response-targets@2.0.4/dist/response-targets.js" {}

                style
                {
                    r#"
                    #indicator.htmx-indicator {
                        display: none;
                    }

                    #indicator.htmx-request .htmx-indicator {
                        display: inline;
                    }

                    #indicator.htmx-request.htmx-indicator {
                        display: inline;
                    }
                    "#
                }

                @for element in head_elements
                {
                    @match element
                    {
                        HeadElement::ScriptSource(text) => script { (text) }
                        HeadElement::ScriptLink(path) => script src=(path) {}
                    }
                }

                // Alerts are transient, clear them a few seconds after they are swapped in.
                script
                {
                    (PreEscaped(r#"
                    document.addEventListener('htmx:afterSettle', function () {
                        const container = document.getElementById('alert-container');
                        if (!container || container.childElementCount === 0) {
                            return;
                        }
                        clearTimeout(window.alertTimeout);
                        window.alertTimeout = setTimeout(function () {
                            container.innerHTML = '';
                        }, 5000);
                    });
                    "#))
                }
            }

            body
                hx-ext="response-targets"
                class="container max-w-full min-h-screen bg-gradient-to-br from-blue-50 to-indigo-100 dark:from-gray-900 dark:to-gray-900"
            {
                (content)

                // Alert container for out-of-band swaps
                (alert_container(None))
            }
        }
    }
}

/// The fixed position container that alerts are swapped into.
///
/// Pass `Some(alert)` to render the container as an out-of-band swap that
/// replaces the current alert.
pub fn alert_container(alert: Option<Markup>) -> Markup {
    html! {
        div
            id="alert-container"
            hx-swap-oob=[alert.as_ref().map(|_| "true")]
            class="w-full max-w-md px-4"
            style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
        {
            @if let Some(alert) = alert {
                (alert)
            }
        }
    }
}

pub fn error_view(title: &str, header: &str, description: &str, fix: &str) -> Markup {
    // Template adapted from https://flowbite.com/blocks/marketing/404/
    let content = html!(
        section class="bg-white dark:bg-gray-900"
        {
            div class="py-8 px-4 mx-auto max-w-screen-xl lg:py-16 lg:px-6"
            {
                div class="mx-auto max-w-screen-sm text-center"
                {
                    h1
                        class="mb-4 text-7xl tracking-tight font-extrabold
                            lg:text-9xl text-blue-600 dark:text-blue-500"
                    {
                        (header)
                    }

                    p
                        class="mb-4 text-3xl md:text-4xl tracking-tight
                            font-bold text-gray-900 dark:text-white"
                    {
                        (description)
                    }

                    p
                        class="mb-4 text-1xl md:text-2xl tracking-tight
                            text-gray-900 dark:text-white"
                    {
                        (fix)
                    }

                    a
                        href="/"
                        class="inline-flex text-white bg-blue-600
                            hover:bg-blue-800 focus:ring-4 focus:outline-hidden
                            focus:ring-blue-300 font-medium rounded text-sm px-5
                            py-2.5 text-center dark:focus:ring-blue-900 my-4"
                    {
                        "Back to Homepage"
                    }
                }
            }
        }
    );

    base(title, &[], &content)
}

pub fn log_in_register(form_title: &str, form: &Markup) -> Markup {
    html! {
        div class="flex flex-col items-center justify-center px-6 py-8 mx-auto"
        {
            span class="flex items-center mb-6 text-2xl font-semibold text-gray-900 dark:text-white"
            {
                "Personal Finance Tracker"
            }

            div class="w-full bg-white rounded-lg shadow dark:border md:mt-0 sm:max-w-md xl:p-0 dark:bg-gray-800 dark:border-gray-700"
            {
                div class="p-6 space-y-4 md:space-y-6 sm:p-8"
                {
                    h1 class="text-xl font-bold leading-tight tracking-tight text-gray-900 md:text-2xl dark:text-white"
                    {
                        (form_title)
                    }

                    (form)
                }
            }
        }
    }
}

pub fn text_input(
    name: &str,
    label: &str,
    type_: &str,
    value: &str,
    placeholder: &str,
    autofocus: bool,
) -> Markup {
    html! {
        div
        {
            label
                for=(name)
                class=(FORM_LABEL_STYLE)
            {
                (label)
            }

            input
                type=(type_)
                name=(name)
                id=(name)
                placeholder=(placeholder)
                class=(FORM_TEXT_INPUT_STYLE)
                required
                autofocus[autofocus]
                value=(value);
        }
    }
}

pub fn password_input(password: &str, min_length: u8, error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label
                for="password"
                class=(FORM_LABEL_STYLE)
            {
                "Password"
            }

            input
                type="password"
                name="password"
                id="password"
                placeholder="••••••••"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                value=(password)
                minlength=(min_length);

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }

    }
}

pub fn loading_spinner() -> Markup {
    // Spinner SVG adapted from https://flowbite.com/docs/components/spinner/
    html! {
        svg
            aria-hidden="true"
            role="status"
            class="inline text-white w-4 h-4 me-2 mb-1 animate-spin"
            viewBox="0 0 100 101"
            fill="none"
            xmlns="http://www.w3.org/2000/svg"
        {
            path
                d="M100 50.5908C100 78.2051 77.6142 100.591 50 100.591C22.3858 100.591 0 78.2051 0 50.5908C0 22.9766 22.3858 0.59082 50 0.59082C77.6142 0.59082 100 22.9766 100 50.5908ZM9.08144 50.5908C9.08144 73.1895 27.4013 91.5094 50 91.5094C72.5987 91.5094 90.9186 73.1895 90.9186 50.5908C90.9186 27.9921 72.5987 9.67226 50 9.67226C27.4013 9.67226 9.08144 27.9921 9.08144 50.5908Z"
                fill="#E5E7EB" {}
            path
                d="M93.9676 39.0409C96.393 38.4038 97.8624 35.9116 97.0079 33.5539C95.2932 28.8227 92.871 24.3692 89.8167 20.348C85.8452 15.1192 80.8826 10.7238 75.2124 7.41289C69.5422 4.10194 63.2754 1.94025 56.7698 1.05124C51.7666 0.367541 46.6976 0.446843 41.7345 1.27873C39.2613 1.69328 37.813 4.19778 38.4501 6.62326C39.0873 9.04874 41.5694 10.4717 44.0505 10.1071C47.8511 9.54855 51.7191 9.52689 55.5402 10.0491C60.8642 10.7766 65.9928 12.5457 70.6331 15.2552C75.2735 17.9648 79.3347 21.5619 82.5849 25.841C84.9175 28.9121 86.7997 32.2913 88.1811 35.8758C89.083 38.2158 91.5421 39.6781 93.9676 39.0409Z"
                fill="currentColor" {}
        }
    }
}

/// A full screen message with a pulsing spinner, shown while something is being fetched.
pub fn loading_view(message: &str) -> Markup {
    html! {
        div class="min-h-[50vh] flex items-center justify-center"
        {
            div class="text-center"
            {
                div class="animate-spin rounded-full h-12 w-12 border-b-2 border-blue-600 mx-auto mb-4" {}
                p class="text-gray-600 dark:text-gray-300" { (message) }
            }
        }
    }
}

/// The currency symbol for Indian rupees.
pub const CURRENCY_SYMBOL: &str = "₹";

/// Format `number` as Indian rupees rounded to whole rupees, e.g. "₹1,23,457".
///
/// Digits use the Indian grouping convention: the last three digits form one
/// group and the remaining digits are grouped in pairs.
pub fn format_currency(number: f64) -> String {
    // Rounding first avoids rendering "-₹0" for small negative numbers.
    let rounded = number.round() as i64;
    let grouped = rounded.unsigned_abs().to_formatted_string(&Locale::en_IN);

    if rounded < 0 {
        format!("-{CURRENCY_SYMBOL}{grouped}")
    } else {
        format!("{CURRENCY_SYMBOL}{grouped}")
    }
}

/// A link with blue text for use in a <p> tag.
pub fn link(url: &str, text: &str) -> Markup {
    html! (
        a
            href=(url)
            class=(LINK_STYLE)
        {
          (text)
        }

    )
}
