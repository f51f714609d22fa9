//! The header shown at the top of the dashboard.

use maud::{Markup, html};

use crate::{endpoints, html::BUTTON_SECONDARY_STYLE};

/// The dashboard header with the application title, a greeting and a log out link.
pub struct NavBar<'a> {
    display_name: &'a str,
}

impl<'a> NavBar<'a> {
    /// Create the header, greeting the user by `display_name`.
    pub fn new(display_name: &'a str) -> Self {
        Self { display_name }
    }

    pub fn into_html(self) -> Markup {
        // Template adapted from https://flowbite.com/docs/components/navbar/#default-navbar
        html!(
            nav class="bg-white border-b border-gray-200 dark:bg-gray-900 dark:border-gray-700"
            {
                div
                    class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    div class="flex flex-col"
                    {
                        a
                            href=(endpoints::DASHBOARD_VIEW)
                            class="self-start text-2xl font-semibold whitespace-nowrap text-gray-900 dark:text-white"
                        {
                            "Personal Finance Tracker"
                        }

                        span
                            id="welcome"
                            class="text-sm text-gray-600 dark:text-gray-400"
                        {
                            "Welcome, " (self.display_name)
                        }
                    }

                    a
                        href=(endpoints::LOG_OUT)
                        class=(BUTTON_SECONDARY_STYLE)
                    {
                        "Log out"
                    }
                }
            }
        )
    }
}
