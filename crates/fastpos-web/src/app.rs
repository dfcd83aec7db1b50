//! Main App Component

use leptos::prelude::*;
use leptos_router::{components::*, path};

use crate::pages::LandingPage;

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    view! {
        <Router>
            <main class="app">
                <Routes fallback=|| view! { <p>"Không tìm thấy trang"</p> }>
                    <Route path=path!("/") view=LandingPage />
                </Routes>
            </main>
        </Router>
    }
}
