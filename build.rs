fn main() {
    // Only run on Windows
    #[cfg(target_os = "windows")]
    {
        // Embed version metadata into the executable
        let mut res = winresource::WindowsResource::new();
        res.set("ProductName", "Gnome Bot Overlay");
        res.set("FileDescription", "Always-on-top Start/Stop overlay");
        res.set("LegalCopyright", "Copyright (c) 2024");
        res.compile().expect("Failed to compile Windows resources");
    }
}
