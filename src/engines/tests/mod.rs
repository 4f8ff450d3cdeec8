mod serp_tests;
